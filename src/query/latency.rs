//! Rolling latency buffer for the instrumented query path.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Fixed-capacity buffer of recent query latencies. Oldest samples drop first.
///
/// Recording never blocks: a sample that arrives while the buffer is locked
/// is counted as dropped instead.
#[derive(Debug)]
pub struct LatencyTracker {
    samples: Mutex<VecDeque<u64>>,
    capacity: usize,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LatencySummary {
    pub samples: usize,
    pub dropped: u64,
    pub avg_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencyTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn record(&self, elapsed: Duration) {
        let Ok(mut samples) = self.samples.try_lock() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(elapsed.as_micros() as u64);
    }

    pub fn summary(&self) -> LatencySummary {
        let dropped = self.dropped.load(Ordering::Relaxed);
        let mut sorted: Vec<u64> = match self.samples.lock() {
            Ok(samples) => samples.iter().copied().collect(),
            Err(poisoned) => poisoned.into_inner().iter().copied().collect(),
        };
        if sorted.is_empty() {
            return LatencySummary {
                dropped,
                ..LatencySummary::default()
            };
        }
        sorted.sort_unstable();

        let total: u64 = sorted.iter().sum();
        LatencySummary {
            samples: sorted.len(),
            dropped,
            avg_ms: total as f64 / sorted.len() as f64 / 1000.0,
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
        }
    }
}

/// Nearest-rank percentile over sorted microsecond samples, in milliseconds.
fn percentile(sorted: &[u64], pct: f64) -> f64 {
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    sorted[index] as f64 / 1000.0
}
