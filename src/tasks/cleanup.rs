//! TTL Sweep Task
//!
//! Background task that removes expired entries from every cache region.
//!
//! Each tick visits one region, round-robin, and removes expired entries in
//! batches of at most `sweep_batch`, releasing the region lock between
//! batches so foreground reads are never blocked for a full scan.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheRegistry;

/// Spawns the sweep loop.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let registry = Arc::new(CacheRegistry::from_config(&config)?);
/// let handle = spawn_cleanup_task(registry.clone(), Duration::from_secs(1), 256);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(
    registry: Arc<CacheRegistry>,
    interval: Duration,
    sweep_batch: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let names = registry.region_names();
        info!(
            interval_ms = interval.as_millis() as u64,
            regions = names.len(),
            sweep_batch,
            "Starting TTL sweep task"
        );
        if names.is_empty() {
            return;
        }

        let mut next = 0;
        loop {
            tokio::time::sleep(interval).await;

            let name = &names[next % names.len()];
            next = next.wrapping_add(1);

            let removed = sweep_region(&registry, name, sweep_batch).await;
            if removed > 0 {
                info!(region = %name, removed, "TTL sweep: removed expired entries");
            } else {
                debug!(region = %name, "TTL sweep: no expired entries found");
            }
        }
    })
}

/// Sweeps one region to completion, one batch per lock hold.
pub async fn sweep_region(registry: &CacheRegistry, name: &str, sweep_batch: usize) -> usize {
    let Ok(handle) = registry.region(name) else {
        return 0;
    };
    let batch = sweep_batch.max(1);
    let mut total = 0;
    loop {
        let removed = handle.lock().await.sweep_expired(batch);
        total += removed;
        if removed < batch {
            return total;
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RegionPolicy;

    fn registry() -> Arc<CacheRegistry> {
        let mut registry = CacheRegistry::new();
        for name in ["a", "b"] {
            registry
                .create_region(name, RegionPolicy::new(4096, 100, Duration::from_secs(3600)))
                .unwrap();
        }
        Arc::new(registry)
    }

    async fn put(registry: &CacheRegistry, region: &str, key: &str, ttl: Duration) {
        registry
            .put(region, key.to_string(), "value".to_string(), 5, Some(ttl))
            .await
            .unwrap();
    }

    async fn len(registry: &CacheRegistry, region: &str) -> usize {
        registry.region(region).unwrap().lock().await.len()
    }

    #[tokio::test]
    async fn test_sweep_region_removes_in_batches() {
        let registry = registry();
        for i in 0..7 {
            put(&registry, "a", &format!("k{}", i), Duration::from_millis(10)).await;
        }
        put(&registry, "a", "keep", Duration::from_secs(3600)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let removed = sweep_region(&registry, "a", 2).await;
        assert_eq!(removed, 7);
        assert_eq!(len(&registry, "a").await, 1);

        let stats = registry.stats(Some("a")).await.unwrap();
        assert_eq!(stats[0].expirations, 7);
    }

    #[tokio::test]
    async fn test_sweep_unknown_region_is_noop() {
        assert_eq!(sweep_region(&registry(), "missing", 10).await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_task_visits_every_region() {
        let registry = registry();
        put(&registry, "a", "expire_soon", Duration::from_millis(10)).await;
        put(&registry, "b", "expire_soon", Duration::from_millis(10)).await;
        put(&registry, "b", "long_lived", Duration::from_secs(3600)).await;

        let handle = spawn_cleanup_task(registry.clone(), Duration::from_millis(50), 16);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(len(&registry, "a").await, 0);
        assert_eq!(len(&registry, "b").await, 1);
        assert_eq!(
            registry.get("b", "long_lived").await.unwrap(),
            Some("value".to_string())
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(registry(), Duration::from_secs(1), 16);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
