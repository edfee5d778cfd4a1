//! Truncated Gaussian kernel `max(0, e^(-a s^2) - e^(-a r^2))` with a linearly
//! interpolated lookup table.

/// Entries kept past the radius so interpolation never reads out of bounds.
const GUARD_STEPS: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct GaussianFilter {
    cache: Vec<f64>,
    cache_steps: usize,
    radius: f64,
    alpha: f64,
    exp_s: f64,
    inv_r: f64,
}

impl GaussianFilter {
    pub fn new(alpha: f64, radius: f64, cache_steps: usize) -> Self {
        let mut filter = Self::default();
        filter.initialize(alpha, radius, cache_steps);
        filter
    }

    /// `cache_steps` is raised to at least `GUARD_STEPS + 1`; negative `alpha`
    /// is clamped to zero and `radius` to a tiny positive value.
    pub fn initialize(&mut self, alpha: f64, radius: f64, cache_steps: usize) {
        self.cache_steps = cache_steps.max(GUARD_STEPS + 1);
        self.alpha = alpha.max(0.0);
        self.radius = radius.max(1e-9);
        self.exp_s = (-self.alpha * self.radius * self.radius).exp();
        self.inv_r = 1.0 / self.radius;
        self.generate_cache();
    }

    /// Drop the lookup table; `evaluate` falls back to direct computation.
    pub fn disable_cache(&mut self) {
        self.cache = Vec::new();
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn evaluate(&self, s: f64) -> f64 {
        if self.cache.len() <= GUARD_STEPS {
            return self.calculate(s);
        }

        let steps = self.cache_steps - GUARD_STEPS;
        let position = steps as f64 * s.abs() * self.inv_r;
        let i0 = (position.floor().max(0.0) as usize).min(steps);
        let i1 = (position.ceil().max(0.0) as usize).min(steps);
        let d = position - i0 as f64;

        (1.0 - d) * self.cache[i0] + d * self.cache[i1]
    }

    pub fn calculate(&self, s: f64) -> f64 {
        ((-self.alpha * s * s).exp() - self.exp_s).max(0.0)
    }

    fn generate_cache(&mut self) {
        let steps = self.cache_steps - GUARD_STEPS;
        let step = 1.0 / steps as f64;

        self.cache = vec![0.0; self.cache_steps];
        for i in 0..=steps {
            self.cache[i] = self.calculate(i as f64 * step * self.radius);
        }
    }
}
