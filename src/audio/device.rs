//! cpal output stream that plays the playback ring.
//!
//! The callback copies mono PCM16 from the ring at the play cursor and fans
//! it out to every device channel. The cursor doubles as the safe write
//! position for the next `PlaybackBuffer::fill`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use parking_lot::Mutex;
use tracing::{error, info};

use super::playback::PlaybackBuffer;
use crate::error::{Result, SynthError};

pub struct DeviceOutput {
    _stream: cpal::Stream,
    play_cursor: Arc<AtomicUsize>,
}

impl DeviceOutput {
    /// Open the default output device at the ring's sample rate and start playing.
    pub fn start(playback: Arc<Mutex<PlaybackBuffer>>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SynthError::Device("no audio output device available".into()))?;

        let default_config = device
            .default_output_config()
            .map_err(|e| SynthError::Device(format!("no default output config: {e}")))?;
        let sample_rate = playback.lock().ring().sample_rate();

        let stream_config = cpal::StreamConfig {
            channels: default_config.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let play_cursor = Arc::new(AtomicUsize::new(0));
        let cursor = Arc::clone(&play_cursor);
        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => run::<f32>(&device, &stream_config, playback, cursor),
            cpal::SampleFormat::I16 => run::<i16>(&device, &stream_config, playback, cursor),
            cpal::SampleFormat::U16 => run::<u16>(&device, &stream_config, playback, cursor),
            other => {
                return Err(SynthError::Device(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| SynthError::Device(format!("failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| SynthError::Device(format!("failed to start output stream: {e}")))?;
        info!(
            sample_rate,
            channels = stream_config.channels,
            "audio output stream started"
        );

        Ok(Self {
            _stream: stream,
            play_cursor,
        })
    }

    /// Ring offset of the next sample the device will play.
    pub fn play_cursor(&self) -> usize {
        self.play_cursor.load(Ordering::Acquire)
    }
}

fn run<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    playback: Arc<Mutex<PlaybackBuffer>>,
    cursor: Arc<AtomicUsize>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: Sample + SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels).max(1);
    let mut mono: Vec<i16> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels;
            mono.resize(frames, 0);

            // Never block the device thread on the frame loop
            let Some(pb) = playback.try_lock() else {
                data.fill(T::from_sample(0.0f32));
                return;
            };
            let position = cursor.load(Ordering::Acquire);
            pb.copy_segment(&mut mono, position);
            let next = pb.ring().buffer_index(position, frames as isize);
            drop(pb);
            cursor.store(next, Ordering::Release);

            for (frame, &sample) in data.chunks_mut(channels).zip(&mono) {
                let value = f32::from(sample) / f32::from(i16::MAX);
                frame.fill(T::from_sample(value));
            }
        },
        |err| {
            error!(error = %err, "audio output error");
        },
        None,
    )
}
