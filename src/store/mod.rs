//! Backing Store Module
//!
//! The durable document store is an external collaborator. This module defines
//! the seam the cache layer reads through, an in-process implementation used by
//! the binary and tests, and the client-side timeout/retry policy.

mod document;
mod memory;
mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use document::{compare_values, Document, Filter, SortDirection, SortSpec};
pub use memory::MemoryStore;
pub use retry::RetryingStore;

// == Store Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store refused or failed the request
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete within the client timeout
    #[error("store request timed out after {0} ms")]
    Timeout(u64),

    /// Every attempt allowed by the retry policy failed
    #[error("store request failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Store Query ==
/// Range query over one collection, resuming strictly after `start_after`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreQuery {
    pub collection: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub order_by: SortSpec,
    /// `(sort value, id)` of the last row already returned
    #[serde(default)]
    pub start_after: Option<(Value, String)>,
    pub limit: usize,
    /// Projected data fields; None fetches the whole document
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

// == Document Store ==
/// Equality/range/prefix query capability over named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Rows matching every filter, in `order_by` order, after `start_after`.
    async fn query(&self, query: &StoreQuery) -> StoreResult<Vec<Document>>;

    /// Documents with the given ids in one round trip. Missing ids are skipped.
    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
        fields: Option<&[String]>,
    ) -> StoreResult<Vec<Document>>;

    /// Inserts or replaces a document; the store assigns `updated_at`.
    async fn upsert(&self, collection: &str, doc: Document) -> StoreResult<Document>;

    /// Deletes a document. Returns false if it did not exist.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;
}
