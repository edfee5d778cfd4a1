//! Producer side: resamples the variable-rate simulation stream onto the
//! audio-rate grid of each channel's input ring.

use crate::audio::ring_buffer::RingBuffer;
use crate::filters::{Filter, LowPassFilter};

/// Raw resampled samples for one input channel.
pub(crate) struct ChannelInput {
    pub data: RingBuffer<f32>,
    last_input_sample: f64,
    antialiasing: LowPassFilter,
}

impl ChannelInput {
    fn new(buffer_size: usize, antialiasing_cutoff: f32, audio_sample_rate: f64) -> Self {
        Self {
            data: RingBuffer::new(buffer_size),
            last_input_sample: 0.0,
            antialiasing: LowPassFilter::new(antialiasing_cutoff, audio_sample_rate as f32),
        }
    }
}

/// Everything guarded by the input lock.
pub(crate) struct InputState {
    pub channels: Vec<ChannelInput>,
    buffer_size: usize,
    input_sample_rate: f64,
    audio_sample_rate: f64,
    /// Fractional audio-rate position of the latest input sample.
    write_offset: f64,
    last_input_sample_offset: f64,
    /// Samples copied by the last render pass, discarded at the next block end.
    pub samples_read: usize,
    /// Channel-0 queue depth recorded at the last block end.
    pub latency: usize,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(0, 1, 1.0, 1.0, 0.0)
    }
}

impl InputState {
    pub fn new(
        channel_count: usize,
        buffer_size: usize,
        input_sample_rate: f64,
        audio_sample_rate: f64,
        antialiasing_cutoff: f32,
    ) -> Self {
        Self {
            channels: (0..channel_count)
                .map(|_| ChannelInput::new(buffer_size, antialiasing_cutoff, audio_sample_rate))
                .collect(),
            buffer_size,
            input_sample_rate,
            audio_sample_rate,
            write_offset: 0.0,
            last_input_sample_offset: 0.0,
            samples_read: 0,
            latency: 0,
        }
    }

    pub fn audio_sample_rate(&self) -> f64 {
        self.audio_sample_rate
    }

    pub fn set_input_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate > 0.0 && sample_rate.is_finite() {
            self.input_sample_rate = sample_rate;
        }
    }

    /// Queued samples in channel 0.
    pub fn queued(&self) -> usize {
        self.channels.first().map_or(0, |c| c.data.size())
    }

    pub fn capacity(&self) -> usize {
        self.buffer_size
    }

    /// Forward distance from `s0` to `s1` on the input ring.
    #[inline]
    fn input_distance(&self, s1: f64, s0: f64) -> f64 {
        if s1 < s0 {
            self.buffer_size as f64 - s0 + s1
        } else {
            s1 - s0
        }
    }

    /// Accept one simulation sample per channel. Every audio-rate slot between
    /// the previous and the current input position receives a linear
    /// interpolation of the two input samples.
    pub fn write(&mut self, data: &[f64]) {
        if self.channels.is_empty() || data.len() < self.channels.len() {
            return;
        }
        if self.input_sample_rate <= 0.0 || self.buffer_size == 0 {
            return;
        }

        let size = self.buffer_size as f64;
        self.write_offset =
            (self.write_offset + self.audio_sample_rate / self.input_sample_rate).rem_euclid(size);

        let distance = self.input_distance(self.write_offset, self.last_input_sample_offset);
        for (i, &value) in data.iter().enumerate().take(self.channels.len()) {
            if distance <= 1e-12 {
                self.channels[i].last_input_sample = value;
                continue;
            }

            let base = self.channels[i].data.write_index() as f64;
            let mut s = self.input_distance(base, self.last_input_sample_offset);
            let channel = &mut self.channels[i];
            while s <= distance {
                let f = s / distance;
                let sample = channel.last_input_sample * (1.0 - f) + value * f;
                channel.data.write(channel.antialiasing.process(sample as f32));
                s += 1.0;
            }
            channel.last_input_sample = value;
        }

        self.last_input_sample_offset = self.write_offset;
    }

    /// Drop what the last render pass consumed and record the remaining depth.
    pub fn end_block(&mut self) {
        for channel in &mut self.channels {
            channel.data.remove_beginning(self.samples_read);
        }
        self.latency = self.queued();
        self.samples_read = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn drain(state: &InputState, channel: usize) -> Vec<f32> {
        let data = &state.channels[channel].data;
        let mut out = vec![0.0; data.size()];
        data.read(&mut out);
        out
    }

    #[test]
    fn half_rate_input_yields_two_samples_each() {
        let mut state = InputState::new(1, 256, 22050.0, 44100.0, 0.0);

        state.write(&[2.0]);
        assert_eq!(state.queued(), 3);
        for k in 1..20 {
            state.write(&[2.0 * (k + 1) as f64]);
            assert_eq!(state.queued(), 3 + 2 * k);
        }

        let samples = drain(&state, 0);
        for (i, &s) in samples.iter().enumerate() {
            assert_abs_diff_eq!(s, i as f32, epsilon = 1e-4);
        }
    }

    #[test]
    fn equal_rates_pass_samples_through() {
        let mut state = InputState::new(2, 64, 44100.0, 44100.0, 0.0);
        for k in 1..=10 {
            state.write(&[k as f64, -(k as f64)]);
        }
        let left = drain(&state, 0);
        let right = drain(&state, 1);
        assert_eq!(left.len(), 11);
        assert_eq!(&left[1..], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(&right[1..], &[-1.0, -2.0, -3.0, -4.0, -5.0, -6.0, -7.0, -8.0, -9.0, -10.0]);
    }

    #[test]
    fn fractional_ratio_keeps_average_rate() {
        let mut state = InputState::new(1, 4096, 17640.0, 44100.0, 0.0);
        for _ in 0..100 {
            state.write(&[1.0]);
        }
        // 100 inputs at 2.5 slots each, plus the slot at position zero
        assert_eq!(state.queued(), 251);
    }

    #[test]
    fn short_slice_is_ignored() {
        let mut state = InputState::new(3, 64, 44100.0, 44100.0, 0.0);
        state.write(&[1.0, 2.0]);
        assert_eq!(state.queued(), 0);
    }

    #[test]
    fn end_block_discards_consumed_and_records_latency() {
        let mut state = InputState::new(1, 64, 44100.0, 44100.0, 0.0);
        for k in 0..10 {
            state.write(&[k as f64]);
        }
        state.samples_read = 4;
        state.end_block();
        assert_eq!(state.latency, 7);
        assert_eq!(state.samples_read, 0);

        state.end_block();
        assert_eq!(state.latency, 7);
    }

    #[test]
    fn wraps_around_input_ring() {
        let mut state = InputState::new(1, 16, 44100.0, 44100.0, 0.0);
        for k in 0..40 {
            state.write(&[k as f64]);
            state.samples_read = state.queued();
            state.end_block();
        }
        state.write(&[100.0]);
        assert_eq!(drain(&state, 0), vec![100.0]);
    }
}
