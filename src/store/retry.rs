//! Backing-store client policy: per-attempt timeout plus bounded retries.
//!
//! This is the only retry loop on the read path. Callers above it surface
//! `Exhausted` as `BackingStoreUnavailable` without retrying again.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::StorePolicy;
use crate::store::{Document, DocumentStore, StoreError, StoreQuery, StoreResult};

pub struct RetryingStore {
    inner: Arc<dyn DocumentStore>,
    policy: StorePolicy,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn DocumentStore>, policy: StorePolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<T, F, Fut>(&self, op: &'static str, mut call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let timeout_ms = self.policy.timeout.as_millis() as u64;
        let mut last = StoreError::Unavailable("no attempt made".to_string());

        for attempt in 1..=self.policy.max_attempts {
            let outcome = match tokio::time::timeout(self.policy.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(timeout_ms)),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(op, attempt, max_attempts = self.policy.max_attempts, error = %err, "Backing store call failed");
                    last = err;
                }
            }
            if attempt < self.policy.max_attempts {
                let backoff = self.policy.backoff * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(StoreError::Exhausted {
            attempts: self.policy.max_attempts,
            last: last.to_string(),
        })
    }
}

#[async_trait]
impl DocumentStore for RetryingStore {
    async fn query(&self, query: &StoreQuery) -> StoreResult<Vec<Document>> {
        self.run("query", || self.inner.query(query)).await
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
        fields: Option<&[String]>,
    ) -> StoreResult<Vec<Document>> {
        self.run("get_many", || self.inner.get_many(collection, ids, fields))
            .await
    }

    async fn upsert(&self, collection: &str, doc: Document) -> StoreResult<Document> {
        self.run("upsert", || self.inner.upsert(collection, doc.clone()))
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.run("delete", || self.inner.delete(collection, id)).await
    }
}
