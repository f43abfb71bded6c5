//! Optimized reads for one entity kind.
//!
//! Every read goes through the instrumented wrapper under the kind's region.
//! Every write invalidates that region, and any dependent regions, only after
//! the backing store acknowledged it.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::cache::KeyPattern;
use crate::config::EntityPolicy;
use crate::entities::Cursor;
use crate::error::{Result, ServiceError};
use crate::query::{kind_prefix, InstrumentedQuery, QueryDescriptor, QueryOptions};
use crate::store::{Document, DocumentStore, Filter, SortDirection, SortSpec, StoreQuery};

/// Largest page a list call may request.
pub const MAX_PAGE_SIZE: usize = 100;

// == List Request ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    pub page_size: usize,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

// == Page ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Document>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

// == Entity Reader ==
pub struct EntityReader {
    policy: EntityPolicy,
    store: Arc<dyn DocumentStore>,
    queries: Arc<InstrumentedQuery>,
    /// Regions whose `<kind>:` keys also go stale when this kind changes
    dependents: Vec<String>,
}

impl EntityReader {
    pub fn new(
        policy: EntityPolicy,
        store: Arc<dyn DocumentStore>,
        queries: Arc<InstrumentedQuery>,
    ) -> Self {
        Self {
            policy,
            store,
            queries,
            dependents: Vec::new(),
        }
    }

    /// Also invalidate this kind's keys in `region` after every write.
    pub fn with_dependent_region(mut self, region: impl Into<String>) -> Self {
        self.dependents.push(region.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.policy.kind
    }

    pub fn policy(&self) -> &EntityPolicy {
        &self.policy
    }

    /// Sort applied when a request names none: newest first.
    pub fn default_sort(&self) -> SortSpec {
        SortSpec::new(self.policy.default_sort_field.clone(), SortDirection::Desc)
    }

    // == List ==
    /// One page of documents matching `request.filters`, cursor-paginated.
    pub async fn list(&self, request: ListRequest) -> Result<Page> {
        if request.page_size == 0 || request.page_size > MAX_PAGE_SIZE {
            return Err(ServiceError::InvalidQuery(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let sort = request.sort.clone().unwrap_or_else(|| self.default_sort());
        let start_after = match &request.cursor {
            Some(token) => Some(Cursor::decode(token, &sort)?.into_start_after()),
            None => None,
        };

        let descriptor = QueryDescriptor::new(self.kind(), request.page_size)
            .with_sort(sort.clone())
            .with_cursor(request.cursor.clone())
            .with_fields(request.fields.clone());
        let descriptor = request
            .filters
            .iter()
            .cloned()
            .fold(descriptor, QueryDescriptor::with_filter);

        // The sort field is always fetched so the next cursor can be built.
        let fetch_fields = request.fields.as_ref().map(|fields| {
            let mut fetch = fields.clone();
            if !fetch.contains(&sort.field) {
                fetch.push(sort.field.clone());
            }
            fetch
        });
        let store_query = StoreQuery {
            collection: self.policy.collection.clone(),
            filters: request.filters.clone(),
            order_by: sort.clone(),
            start_after,
            limit: request.page_size + 1,
            fields: fetch_fields,
        };

        let store = &self.store;
        let page_size = request.page_size;
        let fields = request.fields.clone();
        self.queries
            .query(&descriptor, move || async move {
                let mut rows = store.query(&store_query).await?;
                let has_more = rows.len() > page_size;
                rows.truncate(page_size);
                let next_cursor = match rows.last() {
                    Some(last) if has_more => Some(Cursor::after(last, &store_query.order_by).encode()),
                    _ => None,
                };
                let items = match &fields {
                    Some(fields) => rows.iter().map(|doc| doc.project(fields)).collect(),
                    None => rows,
                };
                Ok::<_, ServiceError>(Page {
                    items,
                    next_cursor,
                    has_more,
                })
            })
            .await
    }

    // == Get ==
    /// Single-document read. During a store outage an expired cached copy is
    /// served rather than failing.
    pub async fn get(&self, id: &str, fields: Option<Vec<String>>) -> Result<Option<Document>> {
        let descriptor = QueryDescriptor::new(self.kind(), 1)
            .with_filter(Filter::Eq {
                field: "id".to_string(),
                value: Value::String(id.to_string()),
            })
            .with_fields(fields.clone());

        let store = &self.store;
        let collection = &self.policy.collection;
        let ids = [id.to_string()];
        self.queries
            .query_with(&descriptor, QueryOptions::stale_on_error(), move || async move {
                let mut rows = store.get_many(collection, &ids, fields.as_deref()).await?;
                Ok::<_, ServiceError>(rows.pop())
            })
            .await
    }

    // == Batch Get ==
    /// Fetches several documents in one round trip. Duplicate ids are
    /// collapsed; results follow first-occurrence order of `ids`.
    pub async fn batch_get(&self, ids: &[String], fields: Option<Vec<String>>) -> Result<Vec<Document>> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let descriptor = QueryDescriptor::new(self.kind(), unique.len())
            .with_filter(Filter::In {
                field: "id".to_string(),
                values: unique.iter().cloned().map(Value::String).collect(),
            })
            .with_fields(fields.clone());

        let store = &self.store;
        let collection = &self.policy.collection;
        let requested = &unique;
        let mut rows: Vec<Document> = self
            .queries
            .query(&descriptor, move || async move {
                Ok::<_, ServiceError>(store.get_many(collection, requested, fields.as_deref()).await?)
            })
            .await?;

        rows.sort_by_key(|doc| unique.iter().position(|id| *id == doc.id));
        Ok(rows)
    }

    // == Writes ==
    /// Writes a document, then invalidates. A failed write invalidates nothing.
    pub async fn upsert(&self, doc: Document) -> Result<Document> {
        let stored = self.store.upsert(&self.policy.collection, doc).await?;
        self.after_write(Some(&stored.id)).await?;
        Ok(stored)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let existed = self.store.delete(&self.policy.collection, id).await?;
        self.after_write(Some(id)).await?;
        Ok(existed)
    }

    /// Post-mutation notification from an external write path.
    pub async fn notify_mutation(&self, document_id: Option<&str>) -> Result<usize> {
        self.after_write(document_id).await
    }

    async fn after_write(&self, document_id: Option<&str>) -> Result<usize> {
        let mut removed = self.queries.invalidate_kind(self.kind()).await?;
        let pattern = KeyPattern::Prefix(kind_prefix(self.kind()));
        for region in &self.dependents {
            removed += self.queries.invalidate(region, &pattern).await?;
        }
        info!(kind = self.kind(), document_id, removed, "Invalidated after write");
        Ok(removed)
    }
}
