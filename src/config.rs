//! Configuration Module
//!
//! Loads server settings from environment variables and the per-entity cache
//! and ranking policies from an optional JSON policy file. Loaded once at
//! startup; nothing here is reconfigured at runtime.

use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{duration_ms, RegionPolicy};
use crate::error::{Result, ServiceError};

const MB: usize = 1024 * 1024;

// == Field Weight ==
/// Weight of one searchable field. Fields are scored in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldWeight {
    pub field: String,
    pub weight: f64,
}

impl FieldWeight {
    pub fn new(field: impl Into<String>, weight: f64) -> Self {
        Self {
            field: field.into(),
            weight,
        }
    }
}

// == Entity Policy ==
/// Cache and search policy of one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPolicy {
    /// Entity kind, also the name of its cache region
    pub kind: String,
    /// Backing-store collection holding this kind
    pub collection: String,
    pub max_bytes: usize,
    pub max_entries: usize,
    #[serde(with = "duration_ms", rename = "default_ttl_ms")]
    pub default_ttl: Duration,
    /// Fields tallied into search facets
    #[serde(default)]
    pub facet_fields: Vec<String>,
    /// Searchable fields in priority order
    #[serde(default)]
    pub field_weights: Vec<FieldWeight>,
    /// Sort field used when a request names none
    #[serde(default = "default_sort_field")]
    pub default_sort_field: String,
}

fn default_sort_field() -> String {
    "updated_at".to_string()
}

impl EntityPolicy {
    pub fn region_policy(&self) -> RegionPolicy {
        RegionPolicy::new(self.max_bytes, self.max_entries, self.default_ttl)
    }

    fn standard_weights() -> Vec<FieldWeight> {
        vec![
            FieldWeight::new("title", 3.0),
            FieldWeight::new("description", 2.0),
            FieldWeight::new("tags", 2.0),
            FieldWeight::new("hazards", 1.0),
            FieldWeight::new("controls", 1.0),
        ]
    }

    /// Frequently mutated assessment templates.
    pub fn template() -> Self {
        Self {
            kind: "template".to_string(),
            collection: "templates".to_string(),
            max_bytes: 20 * MB,
            max_entries: 500,
            default_ttl: Duration::from_secs(5 * 60),
            facet_fields: vec!["status".to_string(), "category".to_string()],
            field_weights: Self::standard_weights(),
            default_sort_field: default_sort_field(),
        }
    }

    /// Slow-changing hazard reference data.
    pub fn hazard_library() -> Self {
        Self {
            kind: "hazard_library".to_string(),
            collection: "hazard_library".to_string(),
            max_bytes: 10 * MB,
            max_entries: 200,
            default_ttl: Duration::from_secs(15 * 60),
            facet_fields: vec!["category".to_string(), "severity".to_string()],
            field_weights: vec![
                FieldWeight::new("title", 3.0),
                FieldWeight::new("description", 2.0),
                FieldWeight::new("tags", 2.0),
            ],
            default_sort_field: default_sort_field(),
        }
    }

    /// Near-real-time operational assessments.
    pub fn assessment() -> Self {
        Self {
            kind: "assessment".to_string(),
            collection: "assessments".to_string(),
            max_bytes: 15 * MB,
            max_entries: 300,
            default_ttl: Duration::from_secs(2 * 60),
            facet_fields: vec!["status".to_string(), "site".to_string()],
            field_weights: Self::standard_weights(),
            default_sort_field: default_sort_field(),
        }
    }
}

// == Search Policy ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPolicy {
    pub results_region: String,
    /// Kept shorter-lived than entity regions; ranking output is more volatile
    pub results_policy: RegionPolicy,
    pub suggestions_region: String,
    pub suggestions_policy: RegionPolicy,
    /// Upper bound on documents scored per search
    pub max_candidates: usize,
    /// Upper bound on values per filter field
    pub max_filter_values: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            results_region: "search_results".to_string(),
            results_policy: RegionPolicy::new(5 * MB, 200, Duration::from_secs(60)),
            suggestions_region: "search_suggestions".to_string(),
            suggestions_policy: RegionPolicy::new(256 * 1024, 500, Duration::from_secs(24 * 3600)),
            max_candidates: 1000,
            max_filter_values: 20,
        }
    }
}

// == Store Policy ==
/// Timeout and retry policy of the backing-store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

// == Policy File ==
/// On-disk shape of `POLICY_FILE`.
#[derive(Debug, Clone, Deserialize)]
struct PolicyFile {
    entities: Vec<EntityPolicy>,
    #[serde(default)]
    search: Option<SearchPolicy>,
}

/// Server configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Interval between TTL sweep ticks
    pub cleanup_interval: Duration,
    /// Maximum entries removed per sweep lock hold
    pub sweep_batch: usize,
    /// Capacity of the rolling latency buffer
    pub latency_samples: usize,
    pub store: StorePolicy,
    pub search: SearchPolicy,
    pub entities: Vec<EntityPolicy>,
}

impl Config {
    /// Creates a Config from environment variables with built-in entity policies.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL_MS` - TTL sweep interval (default: 1000)
    /// - `SWEEP_BATCH` - entries removed per sweep batch (default: 256)
    /// - `LATENCY_SAMPLES` - rolling latency buffer size (default: 1000)
    /// - `MAX_CANDIDATES` - documents scored per search (default: 1000)
    /// - `MAX_FILTER_VALUES` - values per filter field (default: 20)
    /// - `STORE_TIMEOUT_MS` / `STORE_MAX_ATTEMPTS` / `STORE_BACKOFF_MS` - store client policy
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut search = defaults.search;
        search.max_candidates = env_or("MAX_CANDIDATES", search.max_candidates);
        search.max_filter_values = env_or("MAX_FILTER_VALUES", search.max_filter_values);

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: Duration::from_millis(env_or("CLEANUP_INTERVAL_MS", 1000)),
            sweep_batch: env_or("SWEEP_BATCH", defaults.sweep_batch),
            latency_samples: env_or("LATENCY_SAMPLES", defaults.latency_samples),
            store: StorePolicy {
                timeout: Duration::from_millis(env_or("STORE_TIMEOUT_MS", 2000)),
                max_attempts: env_or("STORE_MAX_ATTEMPTS", defaults.store.max_attempts),
                backoff: Duration::from_millis(env_or("STORE_BACKOFF_MS", 50)),
            },
            search,
            entities: defaults.entities,
        }
    }

    /// `from_env`, then the policy file named by `POLICY_FILE` if set, then validation.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env();
        if let Ok(path) = env::var("POLICY_FILE") {
            config.apply_policy_file(Path::new(&path))?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_policy_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("cannot read policy file {}: {}", path.display(), e))
        })?;
        let file: PolicyFile = serde_json::from_str(&raw).map_err(|e| {
            ServiceError::Config(format!("invalid policy file {}: {}", path.display(), e))
        })?;
        self.entities = file.entities;
        if let Some(mut search) = file.search {
            // Env overrides still win for the scalar limits.
            search.max_candidates = env_or("MAX_CANDIDATES", search.max_candidates);
            search.max_filter_values = env_or("MAX_FILTER_VALUES", search.max_filter_values);
            self.search = search;
        }
        Ok(())
    }

    /// Rejects zero TTLs and bounds, duplicate kinds, non-positive or infinite
    /// weights, and search results that would outlive the entities they rank.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for policy in &self.entities {
            if !seen.insert(policy.kind.as_str()) {
                return Err(ServiceError::Config(format!(
                    "duplicate entity kind '{}'",
                    policy.kind
                )));
            }
            policy.region_policy().validate(&policy.kind)?;
            if let Some(w) = policy.field_weights.iter().find(|w| !w.weight.is_finite() || w.weight <= 0.0) {
                return Err(ServiceError::Config(format!(
                    "entity '{}': weight of '{}' must be positive and finite",
                    policy.kind, w.field
                )));
            }
        }
        for name in [&self.search.results_region, &self.search.suggestions_region] {
            if seen.contains(name.as_str()) {
                return Err(ServiceError::Config(format!(
                    "search region '{}' collides with an entity kind",
                    name
                )));
            }
        }
        self.search
            .results_policy
            .validate(&self.search.results_region)?;
        self.search
            .suggestions_policy
            .validate(&self.search.suggestions_region)?;
        let results_ttl = self.search.results_policy.default_ttl;
        if let Some(policy) = self.entities.iter().find(|p| results_ttl >= p.default_ttl) {
            return Err(ServiceError::Config(format!(
                "search results TTL ({} ms) must be shorter than entity '{}' TTL ({} ms)",
                results_ttl.as_millis(),
                policy.kind,
                policy.default_ttl.as_millis()
            )));
        }
        if self.search.max_candidates == 0 || self.search.max_filter_values == 0 {
            return Err(ServiceError::Config(
                "max_candidates and max_filter_values must be non-zero".to_string(),
            ));
        }
        if self.store.max_attempts == 0 || self.store.timeout.is_zero() {
            return Err(ServiceError::Config(
                "store max_attempts and timeout must be non-zero".to_string(),
            ));
        }
        if self.cleanup_interval.is_zero() || self.sweep_batch == 0 {
            return Err(ServiceError::Config(
                "cleanup interval and sweep batch must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Policy of an entity kind.
    pub fn entity(&self, kind: &str) -> Option<&EntityPolicy> {
        self.entities.iter().find(|p| p.kind == kind)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cleanup_interval: Duration::from_millis(1000),
            sweep_batch: 256,
            latency_samples: 1000,
            store: StorePolicy::default(),
            search: SearchPolicy::default(),
            entities: vec![
                EntityPolicy::template(),
                EntityPolicy::hazard_library(),
                EntityPolicy::assessment(),
            ],
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
