//! Query suggestions from a frequency counter kept in its own cache region.
//!
//! Best-effort: counts live only as long as the region keeps them and are
//! never written to the backing store.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::CacheRegistry;
use crate::error::Result;

const KEY_PREFIX: &str = "q:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub query: String,
    pub count: u64,
}

#[derive(Debug)]
pub struct SuggestionTracker {
    registry: Arc<CacheRegistry>,
    region: String,
}

impl SuggestionTracker {
    pub fn new(registry: Arc<CacheRegistry>, region: impl Into<String>) -> Self {
        Self {
            registry,
            region: region.into(),
        }
    }

    /// Bumps the counter of a normalized query.
    pub async fn record(&self, normalized: &str) -> Result<()> {
        if normalized.is_empty() {
            return Ok(());
        }
        let key = format!("{}{}", KEY_PREFIX, normalized);
        let handle = self.registry.region(&self.region)?;
        let mut region = handle.lock().await;

        let count = region
            .get(&key)
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        let value = count.to_string();
        let size = key.len() + value.len();
        if let Err(err) = region.put(key, value, size, None) {
            debug!(error = %err, "Suggestion not recorded");
        }
        Ok(())
    }

    /// Most frequent recorded queries starting with `prefix`.
    pub async fn top(&self, prefix: &str, limit: usize) -> Result<Vec<Suggestion>> {
        let handle = self.registry.region(&self.region)?;
        let entries = handle
            .lock()
            .await
            .scan_prefix(&format!("{}{}", KEY_PREFIX, prefix));

        let mut suggestions: Vec<Suggestion> = entries
            .into_iter()
            .filter_map(|(key, raw)| {
                Some(Suggestion {
                    query: key.strip_prefix(KEY_PREFIX)?.to_string(),
                    count: raw.parse().ok()?,
                })
            })
            .collect();
        suggestions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        suggestions.truncate(limit);
        Ok(suggestions)
    }

    /// Forgets every recorded query.
    pub async fn reset(&self) -> Result<usize> {
        self.registry.clear(&self.region).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RegionPolicy;
    use std::time::Duration;

    fn tracker() -> SuggestionTracker {
        let mut registry = CacheRegistry::new();
        registry
            .create_region("suggest", RegionPolicy::new(4096, 100, Duration::from_secs(60)))
            .unwrap();
        SuggestionTracker::new(Arc::new(registry), "suggest")
    }

    #[tokio::test]
    async fn test_top_by_frequency_then_text() {
        let tracker = tracker();
        for q in ["ladder fall", "ladder fall", "ladder", "lamp", "scaffold"] {
            tracker.record(q).await.unwrap();
        }

        let top = tracker.top("la", 2).await.unwrap();
        assert_eq!(
            top,
            vec![
                Suggestion { query: "ladder fall".into(), count: 2 },
                Suggestion { query: "ladder".into(), count: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_reset_forgets_everything() {
        let tracker = tracker();
        tracker.record("ladder").await.unwrap();
        tracker.reset().await.unwrap();
        assert!(tracker.top("", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_not_recorded() {
        let tracker = tracker();
        tracker.record("").await.unwrap();
        assert!(tracker.top("", 10).await.unwrap().is_empty());
    }
}
