//! Timing jitter: reads the input back from a short history at a fractional
//! delay that wanders with low-passed noise.

use super::{Filter, LowPassFilter};

#[derive(Debug, Clone)]
pub struct JitterFilter {
    history: Vec<f32>,
    offset: usize,
    jitter_scale: f32,
    noise_filter: LowPassFilter,
    rng: fastrand::Rng,
}

impl Default for JitterFilter {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            offset: 0,
            jitter_scale: 0.0,
            noise_filter: LowPassFilter::default(),
            rng: fastrand::Rng::new(),
        }
    }
}

impl JitterFilter {
    /// `max_jitter` is the history length in samples; zero disables jitter.
    pub fn initialize(&mut self, max_jitter: usize, cutoff_frequency: f32, audio_frequency: f32) {
        self.history = vec![0.0; max_jitter];
        self.offset = 0;
        self.noise_filter = LowPassFilter::new(cutoff_frequency, audio_frequency);
    }

    pub fn destroy(&mut self) {
        self.history = Vec::new();
        self.offset = 0;
    }

    /// Fraction of the history span used for delay, clamped to `[0, 1]`.
    pub fn set_jitter_scale(&mut self, scale: f32) {
        self.jitter_scale = scale.clamp(0.0, 1.0);
    }

    /// Reseed the noise source for reproducible output.
    pub fn seed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
    }

    #[inline]
    fn history_at(&self, delay: usize) -> f32 {
        let len = self.history.len();
        self.history[(self.offset + len - delay % len) % len]
    }
}

impl Filter for JitterFilter {
    fn process(&mut self, sample: f32) -> f32 {
        let len = self.history.len();
        if len == 0 {
            return sample;
        }

        self.history[self.offset] = sample;

        let noise = self.noise_filter.process(self.rng.f32() * 2.0 - 1.0);
        let delay = ((self.jitter_scale * noise).abs() * (len - 1) as f32).min((len - 1) as f32);
        let whole = delay.floor();
        let fraction = delay - whole;

        let near = self.history_at(whole as usize);
        let far = self.history_at((whole as usize + 1).min(len - 1));
        let output = (1.0 - fraction) * near + fraction * far;

        self.offset = (self.offset + 1) % len;
        output
    }
}
