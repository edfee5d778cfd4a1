//! Render-thread telemetry: cycle-time histogram (p50/p95/p99), underrun and
//! overrun counters, and a once-per-second heartbeat window.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Fixed-capacity ring buffer for histogram samples.
struct SampleRing {
    samples: Vec<f64>,
    pos: usize,
    count: usize,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            pos: 0,
            count: 0,
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples[..self.count].to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((p / 100.0) * (self.count as f64 - 1.0)).round() as usize;
        sorted[idx.min(self.count - 1)]
    }
}

/// Counters accumulated between two heartbeats.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeartbeatWindow {
    pub cycles: u64,
    pub underruns: u64,
    pub overruns: u64,
    pub avg_cycle_us: f64,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RenderStats {
    pub cycles: u64,
    pub samples_rendered: u64,
    pub underruns: u64,
    pub overruns: u64,
    pub cycle_p50_us: f64,
    pub cycle_p95_us: f64,
    pub cycle_p99_us: f64,
}

struct MetricsInner {
    cycle_us: SampleRing,
    totals: RenderStats,
    window: HeartbeatWindow,
    window_cycle_us: f64,
    next_heartbeat: Instant,
}

pub struct RenderMetrics {
    inner: Mutex<MetricsInner>,
}

impl Default for RenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner {
                cycle_us: SampleRing::new(1024),
                totals: RenderStats::default(),
                window: HeartbeatWindow::default(),
                window_cycle_us: 0.0,
                next_heartbeat: Instant::now() + HEARTBEAT_INTERVAL,
            }),
        }
    }

    /// Record one render pass. Channel 0 running dry counts as an underrun,
    /// filling past three quarters of its capacity as an overrun.
    pub fn record_cycle(
        &self,
        elapsed_us: f64,
        samples: usize,
        input_buffered: usize,
        input_capacity: usize,
    ) {
        let mut inner = self.inner.lock();
        inner.cycle_us.push(elapsed_us);
        inner.totals.cycles += 1;
        inner.totals.samples_rendered += samples as u64;
        inner.window.cycles += 1;
        inner.window_cycle_us += elapsed_us;

        if input_buffered == 0 {
            inner.totals.underruns += 1;
            inner.window.underruns += 1;
        } else if input_buffered > input_capacity * 3 / 4 {
            inner.totals.overruns += 1;
            inner.window.overruns += 1;
        }
    }

    /// Returns and resets the current window once per heartbeat interval.
    pub fn take_heartbeat(&self, now: Instant) -> Option<HeartbeatWindow> {
        let mut inner = self.inner.lock();
        if now < inner.next_heartbeat {
            return None;
        }

        let mut window = std::mem::take(&mut inner.window);
        if window.cycles > 0 {
            window.avg_cycle_us = inner.window_cycle_us / window.cycles as f64;
        }
        inner.window_cycle_us = 0.0;
        inner.next_heartbeat = now + HEARTBEAT_INTERVAL;
        Some(window)
    }

    pub fn stats(&self) -> RenderStats {
        let inner = self.inner.lock();
        RenderStats {
            cycle_p50_us: inner.cycle_us.percentile(50.0),
            cycle_p95_us: inner.cycle_us.percentile(95.0),
            cycle_p99_us: inner.cycle_us.percentile(99.0),
            ..inner.totals.clone()
        }
    }
}
