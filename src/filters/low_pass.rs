//! One-pole RC low-pass. Also used as the DC tracker that the channel chain
//! subtracts from its input.

use std::f32::consts::PI;

use super::Filter;

#[derive(Debug, Clone, Default)]
pub struct LowPassFilter {
    rc: f32,
    dt: f32,
    y: f32,
}

impl LowPassFilter {
    pub fn new(cutoff: f32, sample_rate: f32) -> Self {
        let mut filter = Self::default();
        filter.set_cutoff_frequency(cutoff, sample_rate);
        filter
    }

    /// Non-positive cutoff or sample rate leaves the filter as a pass-through.
    pub fn set_cutoff_frequency(&mut self, cutoff: f32, sample_rate: f32) {
        if cutoff <= 0.0 || sample_rate <= 0.0 {
            self.rc = 0.0;
            self.dt = 0.0;
            return;
        }
        self.rc = 1.0 / (2.0 * PI * cutoff);
        self.dt = 1.0 / sample_rate;
    }
}

impl Filter for LowPassFilter {
    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        if self.dt <= 0.0 {
            return sample;
        }
        let alpha = self.dt / (self.rc + self.dt);
        self.y += alpha * (sample - self.y);
        self.y
    }
}
