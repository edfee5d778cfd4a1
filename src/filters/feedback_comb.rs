//! IIR feedback comb: `y[n] = x[n] + a_M * y[n - M]`.

use super::Filter;

#[derive(Debug, Clone)]
pub struct FeedbackCombFilter {
    y: Vec<f32>,
    offset: usize,
    /// Feedback gain applied to the output delayed by `M` samples.
    pub a_m: f32,
}

impl Default for FeedbackCombFilter {
    fn default() -> Self {
        Self {
            y: Vec::new(),
            offset: 0,
            a_m: 1.0,
        }
    }
}

impl FeedbackCombFilter {
    /// Allocate a delay line of `m` samples. `m == 0` makes the filter an identity.
    pub fn initialize(&mut self, m: usize) {
        self.y = vec![0.0; m];
        self.offset = 0;
    }

    pub fn destroy(&mut self) {
        self.y = Vec::new();
        self.offset = 0;
    }
}

impl Filter for FeedbackCombFilter {
    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        let m = self.y.len();
        if m == 0 {
            return sample;
        }

        let y_n = sample + self.a_m * self.y[self.offset];
        self.y[self.offset] = y_n;
        self.offset = (self.offset + 1) % m;
        y_n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_feedback_is_identity() {
        let mut comb = FeedbackCombFilter::default();
        comb.initialize(4);
        comb.a_m = 0.0;
        for x in [1.0, -2.0, 3.5, 0.0, 8.0, -1.0] {
            assert_eq!(comb.process(x), x);
        }
    }

    #[test]
    fn empty_delay_is_identity() {
        let mut comb = FeedbackCombFilter::default();
        assert_eq!(comb.process(2.0), 2.0);
        comb.initialize(0);
        assert_eq!(comb.process(-5.0), -5.0);
        comb.initialize(3);
        comb.destroy();
        assert_eq!(comb.process(1.5), 1.5);
    }

    #[test]
    fn impulse_echoes_every_m_samples() {
        let mut comb = FeedbackCombFilter::default();
        comb.initialize(3);
        comb.a_m = 0.5;

        let out: Vec<f32> = (0..10)
            .map(|i| comb.process(if i == 0 { 1.0 } else { 0.0 }))
            .collect();
        assert_eq!(out, vec![1.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.25, 0.0, 0.0, 0.125]);
    }
}
