//! Multi-channel engine sound synthesizer.
//!
//! A simulation thread pushes one sample per channel at a variable rate with
//! [`Synthesizer::write_input`] and closes each frame with
//! [`Synthesizer::end_input_block`]. A dedicated render thread resamples,
//! filters and mixes the block into PCM16, which the playback side drains with
//! [`Synthesizer::read_audio_output`].

mod channel;
mod input;
mod render;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::audio::ring_buffer::RingBuffer;
use crate::config::{AudioParameters, Parameters};
use crate::error::{Result, SynthError};
use crate::metrics::{RenderMetrics, RenderStats};
use crate::state_machine::{Lifecycle, SynthState};

use channel::{ChannelProcessor, MasterBus};
use input::InputState;

/// The render thread stops once this many samples are waiting in the output ring.
pub const HIGH_WATER_MARK: usize = 2000;
/// Cutoff of the per-channel low-pass applied while resampling input.
pub const INPUT_ANTIALIASING_CUTOFF: f32 = 1900.0;

/// State guarded by the render lock and its condition variable.
struct RenderShared {
    /// Set once a pass has consumed the pending block; cleared by `end_input_block`.
    /// Starts set so nothing renders before the first block end.
    processed: bool,
    /// A consumed block is still being filtered.
    in_flight: bool,
    audio_parameters: AudioParameters,
    output: RingBuffer<i16>,
    leveler_gain: f32,
}

impl RenderShared {
    fn new(audio_buffer_size: usize, audio_parameters: AudioParameters) -> Self {
        Self {
            processed: true,
            in_flight: false,
            audio_parameters,
            output: RingBuffer::new(audio_buffer_size),
            leveler_gain: 1.0,
        }
    }
}

impl Default for RenderShared {
    fn default() -> Self {
        Self::new(0, AudioParameters::default())
    }
}

/// Filter state touched only by the render pass and impulse-response loading.
#[derive(Default)]
struct DspState {
    processors: Vec<ChannelProcessor>,
    master: Option<MasterBus>,
    audio_sample_rate: f32,
}

impl DspState {
    fn new(channel_count: usize, audio_sample_rate: f32, parameters: &AudioParameters) -> Self {
        Self {
            processors: (0..channel_count)
                .map(|_| ChannelProcessor::new(HIGH_WATER_MARK, audio_sample_rate, parameters))
                .collect(),
            master: Some(MasterBus::new(audio_sample_rate, parameters)),
            audio_sample_rate,
        }
    }

    /// Filter the first `n` transfer samples of every channel into `out`.
    fn render(&mut self, n: usize, parameters: &AudioParameters, out: &mut [i16]) {
        let Some(master) = self.master.as_mut() else {
            out.fill(0);
            return;
        };

        for processor in &mut self.processors {
            processor.apply_parameters(parameters, self.audio_sample_rate);
        }

        for (i, slot) in out.iter_mut().enumerate().take(n) {
            let signal: f32 = self
                .processors
                .iter_mut()
                .map(|p| {
                    let sample = p.transfer[i];
                    p.process(sample, parameters)
                })
                .sum();
            *slot = master.process(signal, parameters);
        }
    }

    fn leveler_gain(&self) -> f32 {
        self.master.as_ref().map_or(1.0, MasterBus::leveler_gain)
    }
}

pub(crate) struct Core {
    render: Mutex<RenderShared>,
    render_signal: Condvar,
    input: Mutex<InputState>,
    dsp: Mutex<DspState>,
    running: AtomicBool,
    metrics: RenderMetrics,
}

impl Core {
    fn new() -> Self {
        Self {
            render: Mutex::new(RenderShared::default()),
            render_signal: Condvar::new(),
            input: Mutex::new(InputState::default()),
            dsp: Mutex::new(DspState::default()),
            running: AtomicBool::new(false),
            metrics: RenderMetrics::new(),
        }
    }

    /// A block is pending, channel 0 has input and the output ring has room.
    /// Called with the render lock held.
    fn block_ready(&self, shared: &RenderShared) -> bool {
        if shared.processed || shared.output.size() >= HIGH_WATER_MARK {
            return false;
        }
        self.input.lock().queued() > 0
    }

    /// Clear `processed` under the render lock and wake every waiter.
    fn signal_block(&self) {
        self.render.lock().processed = false;
        self.render_signal.notify_all();
    }
}

/// Thread-safe synthesizer handle. Share it behind an `Arc` between the
/// simulation thread and the playback thread.
pub struct Synthesizer {
    core: Arc<Core>,
    lifecycle: Lifecycle,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer {
    pub fn new() -> Self {
        Self {
            core: Arc::new(Core::new()),
            lifecycle: Lifecycle::new(),
            thread: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SynthState {
        self.lifecycle.current()
    }

    /// Allocate buffers and filters for `parameters`. Every channel starts with
    /// an identity impulse response. Rejected while the render thread runs.
    pub fn initialize(&self, parameters: &Parameters) -> Result<()> {
        self.lifecycle.transition(SynthState::Initialized)?;

        let p = parameters.sanitized();
        let audio_parameters = p.initial_audio_parameters.clamped();
        let audio_rate = p.audio_sample_rate as f32;

        *self.core.render.lock() = RenderShared::new(p.audio_buffer_size, audio_parameters);
        *self.core.input.lock() = InputState::new(
            p.input_channel_count,
            p.input_buffer_size,
            p.input_sample_rate,
            p.audio_sample_rate,
            INPUT_ANTIALIASING_CUTOFF,
        );
        *self.core.dsp.lock() = DspState::new(p.input_channel_count, audio_rate, &audio_parameters);

        info!(
            channels = p.input_channel_count,
            input_buffer = p.input_buffer_size,
            audio_buffer = p.audio_buffer_size,
            input_rate = p.input_sample_rate,
            audio_rate = p.audio_sample_rate,
            "synthesizer initialized"
        );
        Ok(())
    }

    /// Release all buffers. Stops the render thread first if it is running.
    pub fn destroy(&self) -> Result<()> {
        if self.state() == SynthState::Rendering {
            self.end_audio_rendering_thread()?;
        }
        self.lifecycle.transition(SynthState::Destroyed)?;

        *self.core.render.lock() = RenderShared::default();
        *self.core.input.lock() = InputState::default();
        *self.core.dsp.lock() = DspState::default();
        info!("synthesizer destroyed");
        Ok(())
    }

    /// Replace the convolution kernel of `channel` from signed 16-bit PCM.
    /// Out-of-range channels are ignored.
    pub fn initialize_impulse_response(&self, pcm: &[i16], volume: f32, channel: usize) {
        let state = self.state();
        if !state.is_live() {
            warn!(?state, channel, "impulse response ignored, synthesizer not initialized");
            return;
        }

        let mut dsp = self.core.dsp.lock();
        let Some(processor) = dsp.processors.get_mut(channel) else {
            warn!(channel, "impulse response for unknown channel ignored");
            return;
        };
        let taps = processor.load_impulse_response(pcm, volume);
        debug!(channel, taps, source_samples = pcm.len(), "impulse response loaded");
    }

    pub fn start_audio_rendering_thread(&self) -> Result<()> {
        self.lifecycle.transition(SynthState::Rendering)?;
        self.core.running.store(true, Ordering::Release);

        let core = Arc::clone(&self.core);
        let spawned = std::thread::Builder::new()
            .name("audio-render".into())
            .spawn(move || render::run_render_loop(core));

        match spawned {
            Ok(handle) => {
                *self.thread.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.core.running.store(false, Ordering::Release);
                self.lifecycle.transition(SynthState::Idle)?;
                Err(SynthError::ThreadSpawn(e))
            }
        }
    }

    /// Stop and join the render thread. A no-op when it is not running.
    pub fn end_audio_rendering_thread(&self) -> Result<()> {
        let Some(handle) = self.thread.lock().take() else {
            return Ok(());
        };

        self.core.running.store(false, Ordering::Release);
        self.core.signal_block();
        if handle.join().is_err() {
            warn!("audio render thread panicked");
        }

        self.lifecycle.transition(SynthState::Idle)?;
        Ok(())
    }

    /// Push one simulation sample per channel. Slices shorter than the channel
    /// count are ignored; extra values are dropped.
    pub fn write_input(&self, data: &[f64]) {
        self.core.input.lock().write(data);
    }

    /// Close the current frame: drop the input the last pass consumed, record
    /// the queue depth as latency and let the render thread take the next block.
    pub fn end_input_block(&self) {
        self.core.input.lock().end_block();
        self.core.signal_block();
    }

    /// Drain up to `out.len()` rendered samples and zero-fill the rest.
    /// Never waits on the render thread. Returns the number of real samples.
    pub fn read_audio_output(&self, out: &mut [i16]) -> usize {
        if out.is_empty() {
            return 0;
        }

        let drained = self.core.render.lock().output.read_and_remove(out);
        out[drained..].fill(0);
        if drained > 0 {
            self.core.render_signal.notify_all();
        }
        drained
    }

    /// Block until the pending input block has been rendered into the output
    /// ring, or `timeout` elapses. Returns whether the block completed.
    pub fn wait_processed_timeout(&self, timeout: Duration) -> bool {
        let mut render = self.core.render.lock();
        self.core.render_signal.wait_while_for(
            &mut render,
            |shared| !shared.processed || shared.in_flight,
            timeout,
        );
        render.processed && !render.in_flight
    }

    pub fn audio_parameters(&self) -> AudioParameters {
        self.core.render.lock().audio_parameters
    }

    /// Takes effect at the start of the next render pass.
    pub fn set_audio_parameters(&self, parameters: AudioParameters) {
        self.core.render.lock().audio_parameters = parameters.clamped();
    }

    /// Non-positive or non-finite rates are ignored.
    pub fn set_input_sample_rate(&self, sample_rate: f64) {
        self.core.input.lock().set_input_sample_rate(sample_rate);
    }

    /// Channel-0 input depth at the last block end, in audio samples.
    pub fn input_latency_samples(&self) -> usize {
        self.core.input.lock().latency
    }

    /// Input latency in seconds.
    pub fn latency(&self) -> f64 {
        let input = self.core.input.lock();
        input.latency as f64 / input.audio_sample_rate()
    }

    /// Rendered samples waiting to be read.
    pub fn output_buffered(&self) -> usize {
        self.core.render.lock().output.size()
    }

    /// Leveler gain published by the last render pass.
    pub fn leveler_gain(&self) -> f32 {
        self.core.render.lock().leveler_gain
    }

    pub fn render_stats(&self) -> RenderStats {
        self.core.metrics.stats()
    }
}

impl Drop for Synthesizer {
    fn drop(&mut self) {
        if let Err(e) = self.end_audio_rendering_thread() {
            warn!(error = %e, "render thread shutdown on drop failed");
        }
    }
}
