//! Fixed-window moving-average smoothing.

use std::collections::VecDeque;

/// Bounded queue of the last *W* raw samples plus their running sum.
///
/// `push` is O(1) amortized: one eviction, one append, one division.
#[derive(Debug, Clone)]
pub struct SmoothedFeature {
    window: usize,
    samples: VecDeque<f64>,
    sum: f64,
}

impl SmoothedFeature {
    pub fn new(window: usize) -> Self {
        debug_assert!(window >= 1, "validated at definition load");
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    /// Append a raw sample, evicting the oldest once the window is full, and
    /// return the current mean. Callers must not push `NaN`; degenerate
    /// samples are a frame skip upstream.
    pub fn push(&mut self, raw: f64) -> f64 {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(raw);
        self.sum += raw;
        self.sum / self.samples.len() as f64
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.sum / self.samples.len() as f64)
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
