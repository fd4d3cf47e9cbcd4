use std::collections::VecDeque;

/// Fixed-length window of recent samples, oldest first.
///
/// The window is pre-filled with zeros so its length never changes; every
/// push evicts the oldest sample.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<f64>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: std::iter::repeat_n(0.0, capacity).collect(),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.samples.pop_front();
        self.samples.push_back(value);
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn latest(&self) -> f64 {
        self.samples.back().copied().unwrap_or(0.0)
    }

    /// Samples scaled for a sparkline with a 0..=100 range.
    pub fn sparkline_data(&self) -> Vec<u64> {
        self.values()
            .map(|v| v.clamp(0.0, 100.0).round() as u64)
            .collect()
    }
}
