//! Backward-difference derivative over a fixed time step.

use super::Filter;

#[derive(Debug, Clone, Default)]
pub struct DerivativeFilter {
    previous: f32,
    /// Seconds between consecutive samples.
    pub dt: f32,
}

impl DerivativeFilter {
    pub fn new(dt: f32) -> Self {
        Self { previous: 0.0, dt }
    }
}

impl Filter for DerivativeFilter {
    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        let previous = std::mem::replace(&mut self.previous, sample);
        if self.dt.abs() <= 1e-12 {
            return 0.0;
        }
        (sample - previous) / self.dt
    }
}
