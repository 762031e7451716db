// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution time statistics over a sliding window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples kept for the statistics.
pub const DEFAULT_WINDOW: usize = 100;

/// Summary of the current window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Measurements taken since creation (not only those in the window).
    pub count: u64,
    pub max: Duration,
    pub min: Duration,
    pub mean: Duration,
    pub stddev: Duration,
}

/// `tick()` / `tack()` stopwatch.
#[derive(Debug)]
pub struct TimeMeasure {
    window: usize,
    samples: VecDeque<Duration>,
    started: Option<Instant>,
    count: u64,
}

impl TimeMeasure {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            started: None,
            count: 0,
        }
    }

    /// Start one measurement.
    pub fn tick(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stop the measurement started by `tick`. No-op without a prior tick.
    pub fn tack(&mut self) {
        if let Some(start) = self.started.take() {
            self.record(start.elapsed());
        }
    }

    /// Add a sample measured elsewhere.
    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// `None` until the first sample.
    pub fn statistics(&self) -> Option<Statistics> {
        let n = self.samples.len();
        if n == 0 {
            return None;
        }

        let mut max = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut sum = 0.0;
        for s in &self.samples {
            max = max.max(*s);
            min = min.min(*s);
            sum += s.as_secs_f64();
        }
        let mean = sum / n as f64;
        let var = self
            .samples
            .iter()
            .map(|s| {
                let d = s.as_secs_f64() - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;

        Some(Statistics {
            count: self.count,
            max,
            min,
            mean: Duration::from_secs_f64(mean),
            stddev: Duration::from_secs_f64(var.sqrt()),
        })
    }
}

impl Default for TimeMeasure {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert!(TimeMeasure::new().statistics().is_none());
    }

    #[test]
    fn test_statistics() {
        let mut m = TimeMeasure::new();
        for ms in [10, 20, 30] {
            m.record(Duration::from_millis(ms));
        }
        let s = m.statistics().unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.max, Duration::from_millis(30));
        assert_eq!(s.min, Duration::from_millis(10));
        assert!((s.mean.as_secs_f64() - 0.020).abs() < 1e-9);
        // population stddev of {10, 20, 30} ms
        assert!((s.stddev.as_secs_f64() - 0.008_165).abs() < 1e-5);
    }

    #[test]
    fn test_window_slides() {
        let mut m = TimeMeasure::with_window(2);
        for ms in [100, 1, 2] {
            m.record(Duration::from_millis(ms));
        }
        let s = m.statistics().unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.max, Duration::from_millis(2));
    }

    #[test]
    fn test_tick_tack() {
        let mut m = TimeMeasure::new();
        m.tack();
        assert_eq!(m.count(), 0);
        m.tick();
        m.tack();
        assert_eq!(m.count(), 1);
    }
}
