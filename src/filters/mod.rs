//! Per-sample DSP filters used by the channel chain.
//! Each filter owns its history, sized once at initialization, and is never
//! shared between channels.

pub mod convolution;
pub mod derivative;
pub mod feedback_comb;
pub mod gaussian;
pub mod jitter;
pub mod leveling;
pub mod low_pass;

pub use convolution::ConvolutionFilter;
pub use derivative::DerivativeFilter;
pub use feedback_comb::FeedbackCombFilter;
pub use gaussian::GaussianFilter;
pub use jitter::JitterFilter;
pub use leveling::LevelingFilter;
pub use low_pass::LowPassFilter;

/// Stateful single-sample transform `f(x) -> y`.
pub trait Filter {
    fn process(&mut self, sample: f32) -> f32;
}

/// Replace subnormal values with zero so they never reach the accumulators.
#[inline]
pub fn flush_subnormal(value: f32) -> f32 {
    if value.is_subnormal() {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_subnormal_zeroes_tiny_values() {
        assert_eq!(flush_subnormal(f32::MIN_POSITIVE / 4.0), 0.0);
        assert_eq!(flush_subnormal(-f32::MIN_POSITIVE / 2.0), 0.0);
        assert_eq!(flush_subnormal(f32::MIN_POSITIVE), f32::MIN_POSITIVE);
        assert_eq!(flush_subnormal(0.25), 0.25);
    }
}
