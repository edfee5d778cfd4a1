//! Playback pump: once per video frame, tops the device-facing ring up to a
//! target lead ahead of the position the device will play next.

use tracing::{debug, warn};

use super::output_ring::OutputRing;
use crate::config::PlaybackConfig;
use crate::synthesizer::Synthesizer;

/// What one `fill` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct PlaybackFrame {
    pub samples_written: usize,
    /// Lead of the write pointer over the safe position after the fill.
    pub lead_secs: f64,
    /// The write pointer passed the end of the ring.
    pub wrapped: bool,
    /// The lead exceeded the maximum and the write pointer was pulled back.
    pub lead_reset: bool,
}

pub struct PlaybackBuffer {
    ring: OutputRing,
    scratch: Vec<i16>,
    target_lead: usize,
    max_lead: usize,
    reset_lead: usize,
}

impl PlaybackBuffer {
    /// The write pointer starts `target_lead` ahead of the device's first
    /// position, so playback opens on that much silence.
    pub fn new(sample_rate: u32, config: &PlaybackConfig) -> Self {
        let to_samples = |secs: f64| (f64::from(sample_rate) * secs.max(0.0)).round() as usize;
        let buffer_size = to_samples(config.buffer_secs).max(1);
        let clamp = |secs: f64| to_samples(secs).min(buffer_size - 1);

        let target_lead = clamp(config.target_lead_secs);
        let mut ring = OutputRing::new(sample_rate, buffer_size);
        ring.write_pointer = target_lead;

        Self {
            ring,
            scratch: Vec::with_capacity(buffer_size),
            target_lead,
            max_lead: clamp(config.max_lead_secs),
            reset_lead: clamp(config.reset_lead_secs),
        }
    }

    pub fn ring(&self) -> &OutputRing {
        &self.ring
    }

    pub fn write_pointer(&self) -> usize {
        self.ring.write_pointer
    }

    /// Seconds of audio queued between `safe_write_position` and the write pointer.
    pub fn lead(&self, safe_write_position: usize) -> f64 {
        self.ring.time_delta(safe_write_position, self.ring.write_pointer)
    }

    /// Pull rendered samples from `synth` until the write pointer sits
    /// `target_lead` ahead of `safe_write_position`.
    pub fn fill(&mut self, synth: &Synthesizer, safe_write_position: usize) -> PlaybackFrame {
        let mut frame = PlaybackFrame::default();
        let target = self
            .ring
            .buffer_index(safe_write_position, self.target_lead as isize);
        let mut max_write = self.ring.offset_delta(self.ring.write_pointer, target);

        let mut current_lead = self
            .ring
            .offset_delta(safe_write_position, self.ring.write_pointer);
        let new_lead = self.ring.offset_delta(safe_write_position, target);

        if current_lead > self.max_lead {
            warn!(
                lead_samples = current_lead,
                max_lead_samples = self.max_lead,
                "playback lead too large, resetting write pointer"
            );
            self.ring.write_pointer = self
                .ring
                .buffer_index(safe_write_position, self.reset_lead as isize);
            current_lead = self
                .ring
                .offset_delta(safe_write_position, self.ring.write_pointer);
            max_write = self.ring.offset_delta(self.ring.write_pointer, target);
            frame.lead_reset = true;
        }

        if current_lead > new_lead {
            max_write = 0;
        }

        self.scratch.resize(max_write, 0);
        let read = synth.read_audio_output(&mut self.scratch);

        let write_pointer = self.ring.write_pointer;
        for (i, &sample) in self.scratch[..read].iter().enumerate() {
            self.ring.write_sample(sample, write_pointer, i as isize);
        }

        if read > 0 {
            self.ring.commit_block(read);
            if self.ring.write_pointer < write_pointer {
                frame.wrapped = true;
                debug!(
                    write_before = write_pointer,
                    write_after = self.ring.write_pointer,
                    samples = read,
                    "playback ring wrapped"
                );
            }
        }

        frame.samples_written = read;
        frame.lead_secs = self.lead(safe_write_position);
        frame
    }

    /// Copy ring contents starting at `offset` for a device segment.
    pub fn copy_segment(&self, dest: &mut [i16], offset: usize) -> usize {
        self.ring.copy_buffer(dest, offset)
    }
}
