//! In-process document store.
//!
//! Behaves like the backing store for the binary and tests: equality, range and
//! prefix filtering, stable ordering, projection, monotonic timestamps.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{Document, DocumentStore, StoreError, StoreQuery, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    /// Last assigned `updated_at`
    clock: AtomicU64,
    /// When set, every call fails with `Unavailable`
    offline: AtomicBool,
    /// Number of read round trips served
    reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage of the backing store.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Read round trips served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.clock.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self
                .clock
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next as i64,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, query: &StoreQuery) -> StoreResult<Vec<Document>> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&Document> = docs
            .values()
            .filter(|doc| query.filters.iter().all(|f| f.matches(doc)))
            .filter(|doc| match &query.start_after {
                Some((value, id)) => {
                    query.order_by.compare_position(
                        &doc.sort_value(&query.order_by.field),
                        &doc.id,
                        value,
                        id,
                    ) == std::cmp::Ordering::Greater
                }
                None => true,
            })
            .collect();
        rows.sort_by(|a, b| query.order_by.compare(a, b));

        Ok(rows
            .into_iter()
            .take(query.limit)
            .map(|doc| match &query.fields {
                Some(fields) => doc.project(fields),
                None => doc.clone(),
            })
            .collect())
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
        fields: Option<&[String]>,
    ) -> StoreResult<Vec<Document>> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| docs.get(id))
            .map(|doc| match fields {
                Some(fields) => doc.project(fields),
                None => doc.clone(),
            })
            .collect())
    }

    async fn upsert(&self, collection: &str, mut doc: Document) -> StoreResult<Document> {
        self.check_online()?;
        doc.updated_at = self.next_timestamp();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.check_online()?;
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }
}
