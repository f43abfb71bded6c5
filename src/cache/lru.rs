//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{HashMap, VecDeque};

/// Stale queue slots tolerated before the queue is compacted.
const COMPACT_SLACK: usize = 64;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch appends `(key, tick)` to the back of the queue and records the
/// tick as the key's current position. Older slots for the same key become
/// stale and are skipped when popping, so touch, remove and eviction are all
/// O(1) amortized.
///
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Access log, oldest first. May contain stale slots.
    order: VecDeque<(String, u64)>,
    /// Current tick of every live key
    positions: HashMap<String, u64>,
    /// Monotonic access counter
    next_tick: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;
        self.positions.insert(key.to_string(), tick);
        self.order.push_back((key.to_string(), tick));
        self.maybe_compact();
    }

    // == Remove ==
    /// Removes a key from the tracker. Its queue slot is dropped lazily.
    pub fn remove(&mut self, key: &str) {
        self.positions.remove(key);
        self.maybe_compact();
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        while let Some((key, tick)) = self.order.pop_front() {
            if self.positions.get(&key) == Some(&tick) {
                self.positions.remove(&key);
                return Some(key);
            }
        }
        None
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order
            .iter()
            .find(|(key, tick)| self.positions.get(key) == Some(tick))
            .map(|(key, _)| key.as_str())
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
        self.positions.clear();
    }

    fn maybe_compact(&mut self) {
        if self.order.len() <= self.positions.len() * 2 + COMPACT_SLACK {
            return;
        }
        let positions = &self.positions;
        self.order
            .retain(|(key, tick)| positions.get(key) == Some(tick));
    }
}
