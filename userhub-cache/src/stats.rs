//! Cache statistics.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use userhub_core::constants::LATENCY_SAMPLE_CAPACITY;

/// Ring buffer of the most recent latency samples, in milliseconds.
#[derive(Clone, Debug)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl LatencyWindow {
    /// Creates an empty window holding at most `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a sample, dropping the oldest once full.
    pub fn record(&mut self, ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(ms);
    }

    /// Mean of the retained samples, or 0 when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no samples are retained.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drops every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::with_capacity(LATENCY_SAMPLE_CAPACITY)
    }
}

/// Process-wide counters kept next to the cache entries.
#[derive(Clone, Debug, Default)]
pub(crate) struct Counters {
    pub hits: u64,
    pub misses: u64,
    pub latencies: LatencyWindow,
}

impl Counters {
    pub fn reset(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.latencies.clear();
    }
}

/// Point-in-time cache statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries physically held, including expired ones not yet swept
    pub size: usize,
    pub capacity: usize,
    /// Mean of the recent latency samples
    pub average_latency_ms: f64,
    /// Number of latency samples behind `average_latency_ms`
    pub latency_samples: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_drops_oldest() {
        let mut window = LatencyWindow::with_capacity(3);
        for ms in [100.0, 1.0, 2.0, 3.0] {
            window.record(ms);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), 2.0);
    }

    #[test]
    fn test_window_empty_average() {
        assert_eq!(LatencyWindow::default().average(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            size: 1,
            capacity: 10,
            average_latency_ms: 0.0,
            latency_samples: 0,
        };
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
