//! Direct-form FIR convolution over a circular shift register.
//! The write offset rotates backwards instead of shifting history, so each
//! sample costs O(N) with no allocation.

use super::Filter;

#[derive(Debug, Clone, Default)]
pub struct ConvolutionFilter {
    shift_register: Vec<f32>,
    impulse_response: Vec<f32>,
    shift_offset: usize,
}

impl ConvolutionFilter {
    /// Allocate a zeroed kernel and history of `samples` taps.
    pub fn initialize(&mut self, samples: usize) {
        self.destroy();
        self.shift_register = vec![0.0; samples];
        self.impulse_response = vec![0.0; samples];
    }

    /// Single-tap unit kernel.
    pub fn initialize_identity(&mut self) {
        self.initialize(1);
        self.impulse_response[0] = 1.0;
    }

    pub fn destroy(&mut self) {
        self.shift_register = Vec::new();
        self.impulse_response = Vec::new();
        self.shift_offset = 0;
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.impulse_response.len()
    }

    pub fn impulse_response(&self) -> &[f32] {
        &self.impulse_response
    }

    pub fn impulse_response_mut(&mut self) -> &mut [f32] {
        &mut self.impulse_response
    }
}

impl Filter for ConvolutionFilter {
    fn process(&mut self, sample: f32) -> f32 {
        let n = self.sample_count();
        if n == 0 {
            return sample;
        }
        debug_assert_eq!(self.shift_register.len(), n);

        let offset = self.shift_offset;
        self.shift_register[offset] = sample;

        // history[i] is the sample from i steps ago, stored at (offset + i) mod n
        let (head, tail) = self.impulse_response.split_at(n - offset);
        let mut result = 0.0;
        for (k, x) in head.iter().zip(&self.shift_register[offset..]) {
            result += k * x;
        }
        for (k, x) in tail.iter().zip(&self.shift_register[..offset]) {
            result += k * x;
        }

        self.shift_offset = (offset + n - 1) % n;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn single_unit_tap_is_identity() {
        let mut conv = ConvolutionFilter::default();
        conv.initialize_identity();
        for x in [0.0, 1.0, -2.5, 1e6, -7.25] {
            assert_eq!(conv.process(x), x);
        }
    }

    #[test]
    fn uninitialized_passes_through() {
        let mut conv = ConvolutionFilter::default();
        assert_eq!(conv.process(4.0), 4.0);
        conv.initialize(0);
        assert_eq!(conv.process(-1.0), -1.0);
    }

    #[test]
    fn impulse_reproduces_kernel() {
        let kernel = [0.5, 0.25, -0.125, 2.0];
        let mut conv = ConvolutionFilter::default();
        conv.initialize(kernel.len());
        conv.impulse_response_mut().copy_from_slice(&kernel);

        let mut out = Vec::new();
        out.push(conv.process(1.0));
        for _ in 1..8 {
            out.push(conv.process(0.0));
        }
        for (i, &k) in kernel.iter().enumerate() {
            assert_abs_diff_eq!(out[i], k);
        }
        assert!(out[kernel.len()..].iter().all(|&y| y == 0.0));
    }

    #[test]
    fn matches_direct_convolution() {
        let kernel = [0.3, -0.2, 0.1];
        let input = [1.0, 2.0, -1.0, 0.5, 3.0, -2.0, 0.0, 1.5];
        let mut conv = ConvolutionFilter::default();
        conv.initialize(kernel.len());
        conv.impulse_response_mut().copy_from_slice(&kernel);

        for (n, &x) in input.iter().enumerate() {
            let expected: f32 = (0..kernel.len())
                .filter(|&i| i <= n)
                .map(|i| kernel[i] * input[n - i])
                .sum();
            assert_abs_diff_eq!(conv.process(x), expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn reinitialize_resets_history() {
        let mut conv = ConvolutionFilter::default();
        conv.initialize(3);
        conv.impulse_response_mut().fill(1.0);
        conv.process(5.0);
        conv.process(5.0);

        conv.initialize(3);
        conv.impulse_response_mut().fill(1.0);
        assert_eq!(conv.process(1.0), 1.0);
    }
}
