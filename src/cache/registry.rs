//! Cache Region Registry
//!
//! Owns every named region. Built once at startup and then shared read-only;
//! each region carries its own lock so cross-region operations never contend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use crate::cache::{CacheRegion, KeyPattern, Lookup, RegionPolicy, RegionStats};
use crate::config::Config;
use crate::error::{Result, ServiceError};

/// Shared handle to one region and its mutual-exclusion domain.
pub type RegionHandle = Arc<Mutex<CacheRegion>>;

// == Cache Registry ==
#[derive(Debug, Default)]
pub struct CacheRegistry {
    regions: BTreeMap<String, RegionHandle>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry with one region per entity policy plus the search
    /// result and suggestion regions.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for policy in &config.entities {
            registry.create_region(&policy.kind, policy.region_policy())?;
        }
        registry.create_region(&config.search.results_region, config.search.results_policy.clone())?;
        registry.create_region(
            &config.search.suggestions_region,
            config.search.suggestions_policy.clone(),
        )?;
        Ok(registry)
    }

    // == Create Region ==
    /// Registers a new region. Names are unique; policies are validated here.
    pub fn create_region(&mut self, name: &str, policy: RegionPolicy) -> Result<()> {
        if self.regions.contains_key(name) {
            return Err(ServiceError::Config(format!(
                "region '{}' is already registered",
                name
            )));
        }
        let region = CacheRegion::new(name, policy.clone())?;
        info!(
            region = name,
            max_bytes = policy.max_bytes,
            max_entries = policy.max_entries,
            default_ttl_ms = policy.default_ttl.as_millis() as u64,
            "Cache region created"
        );
        self.regions
            .insert(name.to_string(), Arc::new(Mutex::new(region)));
        Ok(())
    }

    // == Region ==
    /// Returns the handle of a registered region.
    pub fn region(&self, name: &str) -> Result<RegionHandle> {
        self.regions
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownRegion(name.to_string()))
    }

    /// Region names in sorted order.
    pub fn region_names(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    pub async fn lookup(&self, region: &str, key: &str) -> Result<Lookup> {
        let handle = self.region(region)?;
        let mut guard = handle.lock().await;
        Ok(guard.lookup(key))
    }

    /// Lookup plus the region's invalidation generation, read under one lock.
    pub async fn lookup_versioned(&self, region: &str, key: &str) -> Result<(Lookup, u64)> {
        let handle = self.region(region)?;
        let mut guard = handle.lock().await;
        let lookup = guard.lookup(key);
        Ok((lookup, guard.generation()))
    }

    pub async fn generation(&self, region: &str) -> Result<u64> {
        let handle = self.region(region)?;
        let guard = handle.lock().await;
        Ok(guard.generation())
    }

    pub async fn get(&self, region: &str, key: &str) -> Result<Option<String>> {
        let handle = self.region(region)?;
        let mut guard = handle.lock().await;
        Ok(guard.get(key))
    }

    /// Stores a value. Returns `CacheRejected` for entries larger than the region.
    pub async fn put(
        &self,
        region: &str,
        key: String,
        value: String,
        size_bytes: usize,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let handle = self.region(region)?;
        let mut guard = handle.lock().await;
        guard.put(key, value, size_bytes, ttl)
    }

    /// Stores a value unless the region was invalidated after `generation`.
    pub async fn put_if_generation(
        &self,
        region: &str,
        key: String,
        value: String,
        size_bytes: usize,
        ttl: Option<Duration>,
        generation: u64,
    ) -> Result<bool> {
        let handle = self.region(region)?;
        let mut guard = handle.lock().await;
        guard.put_if_generation(key, value, size_bytes, ttl, generation)
    }

    pub async fn invalidate(&self, region: &str, pattern: &KeyPattern) -> Result<usize> {
        let handle = self.region(region)?;
        let mut guard = handle.lock().await;
        Ok(guard.invalidate(pattern))
    }

    pub async fn clear(&self, region: &str) -> Result<usize> {
        let handle = self.region(region)?;
        let mut guard = handle.lock().await;
        Ok(guard.clear())
    }

    // == Stats ==
    /// Stats for one region, or for all regions when `region` is None.
    pub async fn stats(&self, region: Option<&str>) -> Result<Vec<RegionStats>> {
        match region {
            Some(name) => {
                let handle = self.region(name)?;
                let guard = handle.lock().await;
                Ok(vec![guard.stats()])
            }
            None => {
                let mut all = Vec::with_capacity(self.regions.len());
                for handle in self.regions.values() {
                    all.push(handle.lock().await.stats());
                }
                Ok(all)
            }
        }
    }
}
