//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the region bounds, expiry and invalidation invariants.

use proptest::prelude::*;
use std::collections::HashSet;
use std::thread::sleep;
use std::time::Duration;

use crate::cache::{CacheRegion, CacheRegistry, KeyPattern, RegionPolicy};

// == Test Configuration ==
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);

fn region(max_bytes: usize, max_entries: usize) -> CacheRegion {
    CacheRegion::new("prop", RegionPolicy::new(max_bytes, max_entries, TEST_DEFAULT_TTL))
        .unwrap()
}

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "(template|hazard|assessment):[a-z0-9_]{1,12}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, size: usize },
    Get { key: String },
    Invalidate { prefix: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), 0usize..400).prop_map(|(key, size)| CacheOp::Put { key, size }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        prop::sample::select(vec!["template:", "hazard:", "assessment:"])
            .prop_map(|p| CacheOp::Invalidate { prefix: p.to_string() }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any operation sequence both bounds hold after every call.
    #[test]
    fn prop_bounds_hold_after_every_op(
        ops in prop::collection::vec(cache_op_strategy(), 1..120),
        max_bytes in 50usize..1000,
        max_entries in 1usize..20,
    ) {
        let mut region = region(max_bytes, max_entries);

        for op in ops {
            match op {
                CacheOp::Put { key, size } => {
                    let _ = region.put(key, "v".to_string(), size, None);
                }
                CacheOp::Get { key } => {
                    let _ = region.get(&key);
                }
                CacheOp::Invalidate { prefix } => {
                    region.invalidate(&KeyPattern::Prefix(prefix));
                }
            }
            prop_assert!(region.current_bytes() <= max_bytes);
            prop_assert!(region.len() <= max_entries);
            let stats = region.stats();
            prop_assert_eq!(stats.current_bytes, region.current_bytes());
            prop_assert_eq!(stats.current_entries, region.len());
        }
    }

    // Hits and misses add up to the number of gets performed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut region = region(10_000, 100);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, size } => {
                    let _ = region.put(key, "v".to_string(), size, None);
                }
                CacheOp::Get { key } => match region.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Invalidate { prefix } => {
                    region.invalidate(&KeyPattern::Prefix(prefix));
                }
            }
        }

        let stats = region.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
    }

    // Invalidating twice is observably the same as invalidating once.
    #[test]
    fn prop_invalidation_idempotent(
        keys in prop::collection::vec(valid_key_strategy(), 1..30),
        prefix in prop::sample::select(vec!["template:", "hazard:", "assessment:"]),
    ) {
        let mut region = region(100_000, 100);
        for key in &keys {
            region.put(key.clone(), "v".to_string(), 1, None).unwrap();
        }

        let pattern = KeyPattern::Prefix(prefix.to_string());
        region.invalidate(&pattern);
        let after_once: HashSet<String> =
            keys.iter().filter(|k| region.contains(k)).cloned().collect();
        let second = region.invalidate(&pattern);
        let after_twice: HashSet<String> =
            keys.iter().filter(|k| region.contains(k)).cloned().collect();

        prop_assert_eq!(second, 0);
        prop_assert_eq!(after_once, after_twice);
        prop_assert!(keys.iter().filter(|k| k.starts_with(prefix)).all(|k| !region.contains(k)));
    }

    // The least recently touched key is the one evicted.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(valid_key_strategy(), 3..8),
        new_key in valid_key_strategy(),
    ) {
        let unique_keys: Vec<String> = keys
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let mut region = region(100_000, unique_keys.len());
        for key in &unique_keys {
            region.put(key.clone(), "v".to_string(), 1, None).unwrap();
        }

        let accessed = unique_keys[0].clone();
        prop_assert!(region.get(&accessed).is_some());
        region.put(new_key.clone(), "v".to_string(), 1, None).unwrap();

        prop_assert!(region.contains(&accessed));
        prop_assert!(!region.contains(&unique_keys[1]));
        prop_assert!(region.contains(&new_key));
    }

    // Registry operations through the async surface keep the same invariants.
    #[test]
    fn prop_registry_put_respects_bounds(sizes in prop::collection::vec(1usize..64, 1..40)) {
        let mut registry = CacheRegistry::new();
        registry
            .create_region("r", RegionPolicy::new(128, 4, TEST_DEFAULT_TTL))
            .unwrap();

        for (i, size) in sizes.into_iter().enumerate() {
            tokio_test::block_on(registry.put("r", format!("k{}", i), "v".to_string(), size, None))
                .unwrap();
        }

        let stats = tokio_test::block_on(registry.stats(Some("r"))).unwrap();
        prop_assert!(stats[0].current_bytes <= 128);
        prop_assert!(stats[0].current_entries <= 4);
    }
}

// Fewer cases for the time-sensitive TTL property
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // An entry past its expiry is never returned, whatever else happened.
    #[test]
    fn prop_expired_never_returned(
        keys in prop::collection::vec(valid_key_strategy(), 1..10),
    ) {
        let mut region = region(100_000, 4);
        for key in &keys {
            region
                .put(key.clone(), "v".to_string(), 1, Some(Duration::from_millis(20)))
                .unwrap();
        }

        sleep(Duration::from_millis(40));

        for key in &keys {
            prop_assert!(region.get(key).is_none());
        }
        prop_assert!(region.is_empty());
    }
}
