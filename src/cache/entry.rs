//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with byte size and TTL.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A single cached payload with its accounting metadata.
///
/// The payload is opaque to the cache: callers store serialized bytes and
/// report their size. The entry is owned by exactly one region.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cache key
    pub key: String,
    /// Serialized payload
    pub value: String,
    /// Size charged against the region byte budget
    pub size_bytes: usize,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Last access timestamp (Unix milliseconds)
    pub last_accessed_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    pub fn new(key: String, value: String, size_bytes: usize, ttl: Duration) -> Self {
        let now = current_timestamp_ms();
        Self {
            key,
            value,
            size_bytes,
            inserted_at: now,
            expires_at: now.saturating_add(ttl.as_millis() as u64),
            last_accessed_at: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Touch ==
    /// Records an access.
    pub fn touch(&mut self) {
        self.last_accessed_at = current_timestamp_ms();
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn entry(ttl: Duration) -> CacheEntry {
        CacheEntry::new("k".to_string(), "payload".to_string(), 7, ttl)
    }

    #[test]
    fn test_entry_creation() {
        let entry = entry(Duration::from_secs(60));

        assert_eq!(entry.value, "payload");
        assert_eq!(entry.size_bytes, 7);
        assert_eq!(entry.expires_at - entry.inserted_at, 60_000);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = entry(Duration::from_millis(30));
        assert!(!entry.is_expired());

        sleep(Duration::from_millis(50));

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), 0);
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = entry(Duration::from_secs(10));

        let remaining = entry.ttl_remaining_ms();
        assert!(remaining <= 10_000);
        assert!(remaining >= 9_000);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = entry(Duration::from_secs(5));
        assert!(entry.is_expired_at(entry.expires_at));
        assert!(!entry.is_expired_at(entry.expires_at - 1));
    }
}
