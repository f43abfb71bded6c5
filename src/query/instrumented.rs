//! Instrumented Query Wrapper
//!
//! Serves reads from the owning cache region, falls through to an executor on
//! miss, and records hit/miss counts and latency for every call.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::cache::{CacheRegistry, KeyPattern, Lookup, RegionStats};
use crate::error::{Result, ServiceError};
use crate::query::descriptor::kind_prefix;
use crate::query::{LatencySummary, LatencyTracker, QueryDescriptor};

// == Query Options ==
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Serve an expired cached value when the backing store is unavailable
    pub allow_stale: bool,
    /// Overrides the region's default TTL for the stored result
    pub ttl: Option<Duration>,
}

impl QueryOptions {
    pub fn stale_on_error() -> Self {
        Self {
            allow_stale: true,
            ttl: None,
        }
    }
}

// == Cache Stats Report ==
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsReport {
    pub regions: Vec<RegionStatsView>,
    pub latency: LatencySummary,
}

/// Region stats as exposed to callers, with the derived hit rate.
#[derive(Debug, Clone)]
pub struct RegionStatsView(pub RegionStats);

impl Serialize for RegionStatsView {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            #[serde(flatten)]
            stats: &'a RegionStats,
            hit_rate: f64,
        }
        View {
            stats: &self.0,
            hit_rate: self.0.hit_rate(),
        }
        .serialize(serializer)
    }
}

// == Instrumented Query ==
#[derive(Debug)]
pub struct InstrumentedQuery {
    registry: Arc<CacheRegistry>,
    latency: LatencyTracker,
}

impl InstrumentedQuery {
    pub fn new(registry: Arc<CacheRegistry>, latency_samples: usize) -> Self {
        Self {
            registry,
            latency: LatencyTracker::new(latency_samples),
        }
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    /// Runs `descriptor` through the region named by its entity kind.
    pub async fn query<T, F, Fut>(&self, descriptor: &QueryDescriptor, executor: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.query_with(descriptor, QueryOptions::default(), executor)
            .await
    }

    pub async fn query_with<T, F, Fut>(
        &self,
        descriptor: &QueryDescriptor,
        options: QueryOptions,
        executor: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = descriptor.cache_key();
        self.cached(&descriptor.entity_kind, key, options, executor)
            .await
    }

    // == Cached ==
    /// Core read-through path over an explicit region and key.
    ///
    /// The region lock is never held across the executor call. A failed
    /// executor leaves the region untouched.
    pub async fn cached<T, F, Fut>(
        &self,
        region: &str,
        key: String,
        options: QueryOptions,
        executor: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = self.read_through(region, key, options, executor).await;
        self.latency.record(started.elapsed());
        result
    }

    async fn read_through<T, F, Fut>(
        &self,
        region: &str,
        key: String,
        options: QueryOptions,
        executor: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (lookup, mut generation) = self.registry.lookup_versioned(region, &key).await?;
        let stale = match lookup {
            Lookup::Hit(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(region, key = %key, "Cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(region, key = %key, error = %err, "Dropping undecodable cache entry");
                    self.registry
                        .invalidate(region, &KeyPattern::Exact(key.clone()))
                        .await?;
                    generation = self.registry.generation(region).await?;
                    None
                }
            },
            Lookup::Expired(raw) => Some(raw),
            Lookup::Miss => None,
        };
        debug!(region, key = %key, "Cache miss");

        let value = match executor().await {
            Ok(value) => value,
            Err(err @ ServiceError::BackingStoreUnavailable(_)) if options.allow_stale => {
                match stale.as_deref().map(|raw| serde_json::from_str::<T>(raw)) {
                    Some(Ok(value)) => {
                        warn!(region, key = %key, error = %err, "Serving stale cached value");
                        return Ok(value);
                    }
                    _ => return Err(err),
                }
            }
            Err(err) => return Err(err),
        };

        self.store(region, key, &value, options.ttl, generation).await;
        Ok(value)
    }

    /// Caches a freshly fetched value unless the region was invalidated while
    /// it was being fetched. Cache-side failures are logged, never returned.
    async fn store<T: Serialize>(
        &self,
        region: &str,
        key: String,
        value: &T,
        ttl: Option<Duration>,
        generation: u64,
    ) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(region, key = %key, error = %err, "Result not cacheable");
                return;
            }
        };
        let size = raw.len();
        match self
            .registry
            .put_if_generation(region, key.clone(), raw, size, ttl, generation)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(region, key = %key, "Region invalidated during fill; result not cached"),
            Err(err @ ServiceError::CacheRejected { .. }) => debug!(region, error = %err, "Cache rejected entry"),
            Err(err) => warn!(region, error = %err, "Cache put failed"),
        }
    }

    // == Invalidation ==
    pub async fn invalidate(&self, region: &str, pattern: &KeyPattern) -> Result<usize> {
        let removed = self.registry.invalidate(region, pattern).await?;
        debug!(region, ?pattern, removed, "Cache invalidated");
        Ok(removed)
    }

    /// Drops every cached read of `entity_kind`.
    pub async fn invalidate_kind(&self, entity_kind: &str) -> Result<usize> {
        self.invalidate(entity_kind, &KeyPattern::Prefix(kind_prefix(entity_kind)))
            .await
    }

    // == Stats ==
    pub async fn cache_stats(&self, region: Option<&str>) -> Result<CacheStatsReport> {
        let regions = self.registry.stats(region).await?;
        Ok(CacheStatsReport {
            regions: regions.into_iter().map(RegionStatsView).collect(),
            latency: self.latency.summary(),
        })
    }
}
