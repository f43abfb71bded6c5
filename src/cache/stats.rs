//! Cache Statistics Module
//!
//! Tracks per-region performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Region Stats ==
/// Snapshot of a region's counters and occupancy.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RegionStats {
    /// Region name
    pub region: String,
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (absent or expired)
    pub misses: u64,
    /// Entries removed to restore the byte/count bounds
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by explicit invalidation
    pub invalidations: u64,
    /// Puts refused because the entry alone exceeds `max_bytes`
    pub rejections: u64,
    /// Bytes currently charged against the region
    pub current_bytes: usize,
    /// Entries currently held
    pub current_entries: usize,
    pub max_bytes: usize,
    pub max_entries: usize,
}

impl RegionStats {
    // == Constructor ==
    /// Creates zeroed stats for a region with the given bounds.
    pub fn new(region: impl Into<String>, max_bytes: usize, max_entries: usize) -> Self {
        Self {
            region: region.into(),
            max_bytes,
            max_entries,
            ..Self::default()
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    pub fn record_rejection(&mut self) {
        self.rejections += 1;
    }

    // == Update Occupancy ==
    pub fn set_occupancy(&mut self, bytes: usize, entries: usize) {
        self.current_bytes = bytes;
        self.current_entries = entries;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = RegionStats::new("template", 1024, 10);
        assert_eq!(stats.region, "template");
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.max_bytes, 1024);
        assert_eq!(stats.max_entries, 10);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = RegionStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = RegionStats::default();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_removal_counters() {
        let mut stats = RegionStats::default();
        stats.record_eviction();
        stats.record_expirations(3);
        stats.record_invalidations(2);
        stats.record_rejection();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expirations, 3);
        assert_eq!(stats.invalidations, 2);
        assert_eq!(stats.rejections, 1);
    }
}
