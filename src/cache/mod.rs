//! Cache Module
//!
//! Bounded, multi-region in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod lru;
mod pattern;
mod region;
mod registry;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use lru::LruTracker;
pub use pattern::KeyPattern;
pub(crate) use region::duration_ms;
pub use region::{CacheRegion, Lookup, RegionPolicy};
pub use registry::{CacheRegistry, RegionHandle};
pub use stats::RegionStats;
