//! Cache Region Module
//!
//! A byte- and count-bounded key/value store with per-entry TTL and LRU eviction.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, KeyPattern, LruTracker, RegionStats};
use crate::error::{Result, ServiceError};

// == Region Policy ==
/// Capacity and freshness policy of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionPolicy {
    /// Upper bound on the summed `size_bytes` of all entries
    pub max_bytes: usize,
    /// Upper bound on the number of entries
    pub max_entries: usize,
    /// TTL applied when a put does not carry its own
    #[serde(with = "duration_ms", rename = "default_ttl_ms")]
    pub default_ttl: Duration,
}

impl RegionPolicy {
    pub fn new(max_bytes: usize, max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            max_bytes,
            max_entries,
            default_ttl,
        }
    }

    /// Rejects policies that could never hold an entry or never expire one.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(ServiceError::Config(format!(
                "region '{}': default TTL must be strictly positive",
                name
            )));
        }
        if self.max_bytes == 0 || self.max_entries == 0 {
            return Err(ServiceError::Config(format!(
                "region '{}': max_bytes and max_entries must be non-zero",
                name
            )));
        }
        Ok(())
    }
}

/// Serde helper storing a `Duration` as integer milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// == Lookup ==
/// Outcome of a region lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Live entry, promoted to most-recently-used
    Hit(String),
    /// Entry is past its TTL; it stays in place until replaced, swept or
    /// dropped by `get`
    Expired(String),
    /// No entry
    Miss,
}

// == Cache Region ==
/// One named, independently bounded cache region.
#[derive(Debug)]
pub struct CacheRegion {
    name: String,
    policy: RegionPolicy,
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: RegionStats,
    /// Summed size of all entries
    current_bytes: usize,
    /// Bumped by every invalidation and clear
    generation: u64,
}

impl CacheRegion {
    // == Constructor ==
    /// Creates an empty region. Fails on a zero TTL or zero bounds.
    pub fn new(name: impl Into<String>, policy: RegionPolicy) -> Result<Self> {
        let name = name.into();
        policy.validate(&name)?;
        let stats = RegionStats::new(name.clone(), policy.max_bytes, policy.max_entries);
        Ok(Self {
            name,
            policy,
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats,
            current_bytes: 0,
            generation: 0,
        })
    }

    // == Lookup ==
    /// Looks up a key, distinguishing expired entries from absent ones.
    ///
    /// Both count as misses. An expired entry is left in place so repeated
    /// callers can still fall back on it; `get`, `put` and the sweep drop it.
    pub fn lookup(&mut self, key: &str) -> Lookup {
        let Some(entry) = self.entries.get_mut(key) else {
            self.stats.record_miss();
            return Lookup::Miss;
        };
        if entry.is_expired() {
            let value = entry.value.clone();
            self.stats.record_miss();
            return Lookup::Expired(value);
        }

        entry.touch();
        let value = entry.value.clone();
        self.lru.touch(key);
        self.stats.record_hit();
        Lookup::Hit(value)
    }

    // == Get ==
    /// Retrieves a live value, promoting it to most-recently-used.
    ///
    /// An expired entry is removed here and counted as a miss.
    pub fn get(&mut self, key: &str) -> Option<String> {
        match self.lookup(key) {
            Lookup::Hit(value) => Some(value),
            Lookup::Expired(_) => {
                self.remove_entry(key);
                self.stats.record_expirations(1);
                self.sync_occupancy();
                None
            }
            Lookup::Miss => None,
        }
    }

    /// Invalidation generation. A fill that started under an older
    /// generation must not be stored.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // == Put ==
    /// Inserts or replaces an entry, then evicts until both bounds hold.
    ///
    /// An entry larger than `max_bytes` is refused with `CacheRejected`; any
    /// previous value for that key is dropped so it cannot be served stale.
    pub fn put(
        &mut self,
        key: String,
        value: String,
        size_bytes: usize,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let ttl = ttl.unwrap_or(self.policy.default_ttl);
        if ttl.is_zero() {
            return Err(ServiceError::Config(format!(
                "region '{}': TTL must be strictly positive",
                self.name
            )));
        }

        if size_bytes > self.policy.max_bytes {
            self.remove_entry(&key);
            self.stats.record_rejection();
            self.sync_occupancy();
            return Err(ServiceError::CacheRejected {
                key,
                size_bytes,
                max_bytes: self.policy.max_bytes,
            });
        }

        self.remove_entry(&key);
        self.lru.touch(&key);
        self.current_bytes += size_bytes;
        self.entries
            .insert(key.clone(), CacheEntry::new(key, value, size_bytes, ttl));

        self.enforce_bounds();
        self.sync_occupancy();
        Ok(())
    }

    /// Stores a value only if no invalidation ran since `generation` was read.
    ///
    /// Returns `Ok(false)` when the fill is outdated and was dropped.
    pub fn put_if_generation(
        &mut self,
        key: String,
        value: String,
        size_bytes: usize,
        ttl: Option<Duration>,
        generation: u64,
    ) -> Result<bool> {
        if generation != self.generation {
            return Ok(false);
        }
        self.put(key, value, size_bytes, ttl).map(|()| true)
    }

    // == Invalidate ==
    /// Removes every key matching `pattern` in one pass. Idempotent.
    ///
    /// Always advances the generation, even when nothing matched, since the
    /// key may belong to a fill still in flight.
    pub fn invalidate(&mut self, pattern: &KeyPattern) -> usize {
        let keys: Vec<String> = match pattern {
            KeyPattern::Exact(key) if self.entries.contains_key(key) => vec![key.clone()],
            KeyPattern::Exact(_) => Vec::new(),
            _ => self
                .entries
                .keys()
                .filter(|key| pattern.matches(key))
                .cloned()
                .collect(),
        };

        for key in &keys {
            self.remove_entry(key);
        }
        self.generation = self.generation.wrapping_add(1);
        self.stats.record_invalidations(keys.len());
        self.sync_occupancy();
        keys.len()
    }

    // == Clear ==
    /// Drops every entry. Counters other than occupancy are kept.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.current_bytes = 0;
        self.generation = self.generation.wrapping_add(1);
        self.stats.record_invalidations(removed);
        self.sync_occupancy();
        removed
    }

    // == Sweep Expired ==
    /// Removes at most `max_batch` expired entries.
    ///
    /// Returns the number removed; a result equal to `max_batch` means more
    /// expired entries may remain.
    pub fn sweep_expired(&mut self, max_batch: usize) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .take(max_batch)
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }
        self.stats.record_expirations(expired.len());
        self.sync_occupancy();
        expired.len()
    }

    // == Scan Prefix ==
    /// Returns live `(key, value)` pairs whose key starts with `prefix`.
    ///
    /// Read-only: does not promote entries or touch counters.
    pub fn scan_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        let now = current_timestamp_ms();
        self.entries
            .values()
            .filter(|entry| entry.key.starts_with(prefix) && !entry.is_expired_at(now))
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect()
    }

    // == Stats ==
    /// Returns current region statistics.
    pub fn stats(&self) -> RegionStats {
        self.stats.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_bytes(&self) -> usize {
        self.current_bytes
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn over_bounds(&self) -> bool {
        self.current_bytes > self.policy.max_bytes || self.entries.len() > self.policy.max_entries
    }

    fn enforce_bounds(&mut self) {
        if !self.over_bounds() {
            return;
        }

        // Expired entries go first, regardless of recency.
        let expired = self.sweep_expired(usize::MAX);
        if expired > 0 {
            debug!(region = %self.name, expired, "Dropped expired entries before eviction");
        }

        while self.over_bounds() {
            let Some(key) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.current_bytes -= entry.size_bytes;
                self.stats.record_eviction();
            }
        }
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.current_bytes -= entry.size_bytes;
        Some(entry)
    }

    fn sync_occupancy(&mut self) {
        self.stats
            .set_occupancy(self.current_bytes, self.entries.len());
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn region(max_bytes: usize, max_entries: usize) -> CacheRegion {
        CacheRegion::new(
            "test",
            RegionPolicy::new(max_bytes, max_entries, Duration::from_secs(300)),
        )
        .unwrap()
    }

    fn put(region: &mut CacheRegion, key: &str, size: usize) {
        region
            .put(key.to_string(), format!("v-{}", key), size, None)
            .unwrap();
    }

    #[test]
    fn test_region_put_and_get() {
        let mut region = region(1024, 10);

        put(&mut region, "key1", 10);

        assert_eq!(region.get("key1"), Some("v-key1".to_string()));
        assert_eq!(region.len(), 1);
        assert_eq!(region.current_bytes(), 10);
    }

    #[test]
    fn test_region_rejects_zero_ttl() {
        let result = CacheRegion::new("bad", RegionPolicy::new(10, 10, Duration::ZERO));
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn test_region_rejects_zero_bounds() {
        let result = CacheRegion::new("bad", RegionPolicy::new(0, 10, Duration::from_secs(1)));
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn test_region_overwrite_adjusts_bytes() {
        let mut region = region(1024, 10);

        put(&mut region, "key1", 100);
        put(&mut region, "key1", 40);

        assert_eq!(region.len(), 1);
        assert_eq!(region.current_bytes(), 40);
    }

    #[test]
    fn test_lru_scenario_count_bound() {
        let mut region = region(1024, 2);

        put(&mut region, "k1", 1);
        put(&mut region, "k2", 1);
        assert!(region.get("k1").is_some());
        put(&mut region, "k3", 1);

        assert!(region.contains("k1"));
        assert!(!region.contains("k2"));
        assert!(region.contains("k3"));
        assert_eq!(region.stats().evictions, 1);
    }

    #[test]
    fn test_byte_bound_evicts_until_fit() {
        let mut region = region(100, 10);

        put(&mut region, "a", 40);
        put(&mut region, "b", 40);
        put(&mut region, "c", 70);

        assert!(!region.contains("a"));
        assert!(!region.contains("b"));
        assert!(region.contains("c"));
        assert!(region.current_bytes() <= 100);
    }

    #[test]
    fn test_oversized_entry_rejected_without_evicting() {
        let mut region = region(100, 10);

        put(&mut region, "a", 40);
        let result = region.put("huge".to_string(), "x".to_string(), 101, None);

        assert!(matches!(result, Err(ServiceError::CacheRejected { .. })));
        assert!(region.contains("a"));
        assert!(region.get("huge").is_none());
        assert_eq!(region.stats().rejections, 1);
    }

    #[test]
    fn test_expired_entry_is_miss() {
        let mut region = region(1024, 10);

        region
            .put("k".to_string(), "v".to_string(), 1, Some(Duration::from_millis(20)))
            .unwrap();
        sleep(Duration::from_millis(40));

        assert_eq!(region.get("k"), None);
        assert_eq!(region.lookup("k"), Lookup::Miss);
        assert_eq!(region.current_bytes(), 0);
        assert_eq!(region.stats().misses, 2);
        assert_eq!(region.stats().expirations, 1);
    }

    #[test]
    fn test_expired_lookup_keeps_fallback() {
        let mut region = region(1024, 10);

        region
            .put("k".to_string(), "v".to_string(), 1, Some(Duration::from_millis(20)))
            .unwrap();
        sleep(Duration::from_millis(40));

        assert_eq!(region.lookup("k"), Lookup::Expired("v".to_string()));
        assert_eq!(region.lookup("k"), Lookup::Expired("v".to_string()));
        assert_eq!(region.stats().hits, 0);
        assert_eq!(region.stats().misses, 2);
        assert!(region.get("k").is_none());
        assert!(region.is_empty());
    }

    #[test]
    fn test_outdated_fill_is_dropped() {
        let mut region = region(1024, 10);
        let generation = region.generation();

        // Nothing cached yet, but the invalidation still counts.
        assert_eq!(region.invalidate(&KeyPattern::Prefix("template:".to_string())), 0);

        let stored = region
            .put_if_generation("template:a".to_string(), "old".to_string(), 3, None, generation)
            .unwrap();
        assert!(!stored);
        assert!(!region.contains("template:a"));

        let stored = region
            .put_if_generation(
                "template:a".to_string(),
                "new".to_string(),
                3,
                None,
                region.generation(),
            )
            .unwrap();
        assert!(stored);
        assert_eq!(region.get("template:a"), Some("new".to_string()));
    }

    #[test]
    fn test_clear_advances_generation() {
        let mut region = region(1024, 10);
        let before = region.generation();
        region.clear();
        assert_ne!(region.generation(), before);
    }

    #[test]
    fn test_expired_entries_dropped_before_lru() {
        let mut region = region(1024, 2);

        put(&mut region, "old_live", 1);
        region
            .put("short".to_string(), "v".to_string(), 1, Some(Duration::from_millis(10)))
            .unwrap();
        sleep(Duration::from_millis(30));
        put(&mut region, "new", 1);

        assert!(region.contains("old_live"));
        assert!(region.contains("new"));
        assert!(!region.contains("short"));
        assert_eq!(region.stats().evictions, 0);
        assert_eq!(region.stats().expirations, 1);
    }

    #[test]
    fn test_invalidate_prefix_is_idempotent() {
        let mut region = region(1024, 10);

        put(&mut region, "template:list:a", 1);
        put(&mut region, "template:get:b", 1);
        put(&mut region, "hazard:list:a", 1);

        let pattern = KeyPattern::Prefix("template:".to_string());
        assert_eq!(region.invalidate(&pattern), 2);
        assert_eq!(region.invalidate(&pattern), 0);
        assert_eq!(region.len(), 1);
        assert!(region.contains("hazard:list:a"));
    }

    #[test]
    fn test_clear_resets_occupancy() {
        let mut region = region(1024, 10);
        put(&mut region, "a", 5);
        put(&mut region, "b", 5);

        assert_eq!(region.clear(), 2);
        assert!(region.is_empty());
        assert_eq!(region.stats().current_bytes, 0);
    }

    #[test]
    fn test_sweep_respects_batch() {
        let mut region = region(1024, 10);
        for i in 0..5 {
            region
                .put(format!("k{}", i), "v".to_string(), 1, Some(Duration::from_millis(10)))
                .unwrap();
        }
        sleep(Duration::from_millis(30));

        assert_eq!(region.sweep_expired(2), 2);
        assert_eq!(region.len(), 3);
        assert_eq!(region.sweep_expired(10), 3);
        assert!(region.is_empty());
    }

    #[test]
    fn test_scan_prefix_does_not_touch_stats() {
        let mut region = region(1024, 10);
        put(&mut region, "q:ladder", 1);
        put(&mut region, "q:lamp", 1);
        put(&mut region, "r:ladder", 1);

        let mut found = region.scan_prefix("q:la");
        found.sort();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "q:ladder");
        assert_eq!(region.stats().hits, 0);
    }
}
