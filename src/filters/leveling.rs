//! Automatic gain control: drives a decaying peak estimate toward a target
//! level with the gain clamped to `[min_gain, max_gain]`.

use super::Filter;

const PEAK_DECAY: f32 = 0.99999;
const GAIN_SMOOTHING: f32 = 0.001;

#[derive(Debug, Clone)]
pub struct LevelingFilter {
    pub target: f32,
    pub max_gain: f32,
    pub min_gain: f32,
    peak: f32,
    attenuation: f32,
}

impl Default for LevelingFilter {
    fn default() -> Self {
        Self::new(30000.0, 0.00001, 1.9)
    }
}

impl LevelingFilter {
    pub fn new(target: f32, min_gain: f32, max_gain: f32) -> Self {
        Self {
            target,
            max_gain,
            min_gain,
            peak: target,
            attenuation: 1.0,
        }
    }

    /// Current smoothed gain.
    pub fn attenuation(&self) -> f32 {
        self.attenuation
    }

    fn target_gain(&self) -> f32 {
        let (lo, hi) = if self.min_gain <= self.max_gain {
            (self.min_gain, self.max_gain)
        } else {
            (self.max_gain, self.min_gain)
        };

        if self.peak <= f32::EPSILON {
            return hi;
        }
        (self.target / self.peak).clamp(lo, hi)
    }
}

impl Filter for LevelingFilter {
    #[inline]
    fn process(&mut self, sample: f32) -> f32 {
        let level = sample.abs();
        self.peak = if level > self.peak {
            level
        } else {
            self.peak * PEAK_DECAY
        };

        let gain = self.target_gain();
        self.attenuation += GAIN_SMOOTHING * (gain - self.attenuation);
        sample * self.attenuation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn loud_signal_is_pulled_down_to_target() {
        let mut leveler = LevelingFilter::new(1000.0, 0.01, 2.0);
        let mut y = 0.0;
        for i in 0..20000 {
            let x = if i % 2 == 0 { 4000.0 } else { -4000.0 };
            y = leveler.process(x);
        }
        assert_abs_diff_eq!(leveler.attenuation(), 0.25, epsilon = 1e-3);
        assert_abs_diff_eq!(y.abs(), 1000.0, epsilon = 5.0);
    }

    #[test]
    fn quiet_signal_gain_is_capped() {
        let mut leveler = LevelingFilter::new(30000.0, 0.00001, 1.9);
        for _ in 0..2_000_000 {
            leveler.process(10.0);
        }
        assert!(leveler.attenuation() <= 1.9 + 1e-4);
        assert_abs_diff_eq!(leveler.attenuation(), 1.9, epsilon = 1e-3);
    }

    #[test]
    fn silence_stays_silent() {
        let mut leveler = LevelingFilter::default();
        for _ in 0..1000 {
            assert_eq!(leveler.process(0.0), 0.0);
        }
    }
}
