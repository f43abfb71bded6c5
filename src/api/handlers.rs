//! API Handlers
//!
//! HTTP request handlers for the cache, entity and search endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::CacheRegistry;
use crate::config::Config;
use crate::entities::{EntityCatalog, ListRequest, Page};
use crate::error::{Result, ServiceError};
use crate::models::{
    BatchGetRequest, BatchGetResponse, DeleteResponse, FieldsParams, HealthResponse,
    InvalidationResponse, NotifyRequest, SuggestParams, SuggestResponse, UpsertRequest,
};
use crate::query::{CacheStatsReport, InstrumentedQuery, QueryDescriptor};
use crate::search::{SearchQuery, SearchResponse, SearchService};
use crate::store::{Document, DocumentStore, MemoryStore, RetryingStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CacheRegistry>,
    pub queries: Arc<InstrumentedQuery>,
    pub catalog: Arc<EntityCatalog>,
    pub search: Arc<SearchService>,
}

impl AppState {
    /// Wires the cache, read path and search service over `store`. Store
    /// calls go through the configured timeout/retry policy.
    pub fn new(config: &Config, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let registry = Arc::new(CacheRegistry::from_config(config)?);
        let queries = Arc::new(InstrumentedQuery::new(
            registry.clone(),
            config.latency_samples,
        ));
        let store: Arc<dyn DocumentStore> = Arc::new(RetryingStore::new(store, config.store.clone()));
        let catalog = Arc::new(EntityCatalog::from_config(config, store, queries.clone()));
        let search = Arc::new(SearchService::new(
            catalog.clone(),
            queries.clone(),
            config.search.clone(),
        ));
        Ok(Self {
            registry,
            queries,
            catalog,
            search,
        })
    }

    /// State over an empty in-process store.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config, Arc::new(MemoryStore::new()))
    }
}

// == Reads ==

/// Handler for POST /query
pub async fn query_handler(
    State(state): State<AppState>,
    Json(descriptor): Json<QueryDescriptor>,
) -> Result<Json<Page>> {
    let reader = state.catalog.reader(&descriptor.entity_kind)?;
    let page = reader.list(ListRequest::from(descriptor)).await?;
    Ok(Json(page))
}

/// Handler for POST /entities/:kind/list
pub async fn list_handler(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<ListRequest>,
) -> Result<Json<Page>> {
    let page = state.catalog.reader(&kind)?.list(request).await?;
    Ok(Json(page))
}

/// Handler for GET /entities/:kind/:id
pub async fn get_entity_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Query(params): Query<FieldsParams>,
) -> Result<Json<Document>> {
    state
        .catalog
        .reader(&kind)?
        .get(&id, params.field_list())
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound(format!("{} '{}'", kind, id)))
}

/// Handler for POST /entities/:kind/batch
pub async fn batch_get_handler(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<BatchGetRequest>,
) -> Result<Json<BatchGetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ServiceError::InvalidQuery(error_msg));
    }
    let items = state
        .catalog
        .reader(&kind)?
        .batch_get(&req.ids, req.fields.clone())
        .await?;
    Ok(Json(BatchGetResponse::new(&req.ids, items)))
}

// == Writes ==

/// Handler for PUT /entities/:kind/:id
pub async fn upsert_entity_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(req): Json<UpsertRequest>,
) -> Result<Json<Document>> {
    let stored = state
        .catalog
        .reader(&kind)?
        .upsert(Document::new(id, req.data))
        .await?;
    Ok(Json(stored))
}

/// Handler for DELETE /entities/:kind/:id
pub async fn delete_entity_handler(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.catalog.reader(&kind)?.delete(&id).await?;
    Ok(Json(DeleteResponse::new(id, deleted)))
}

/// Handler for POST /notify
///
/// Invalidation hook for writes that bypass this service.
pub async fn notify_handler(
    State(state): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<InvalidationResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ServiceError::InvalidQuery(error_msg));
    }
    let invalidated = state
        .catalog
        .reader(&req.entity_kind)?
        .notify_mutation(req.document_id.as_deref())
        .await?;
    Ok(Json(InvalidationResponse { invalidated }))
}

// == Search ==

/// Handler for POST /search
pub async fn search_handler(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    Ok(Json(state.search.search(query).await?))
}

/// Handler for GET /suggest
pub async fn suggest_handler(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>> {
    let suggestions = state.search.suggest(&params.prefix, params.limit).await?;
    Ok(Json(SuggestResponse {
        prefix: params.prefix,
        suggestions,
    }))
}

/// Handler for DELETE /suggest
pub async fn reset_suggestions_handler(
    State(state): State<AppState>,
) -> Result<Json<InvalidationResponse>> {
    let invalidated = state.search.reset_suggestions().await?;
    Ok(Json(InvalidationResponse { invalidated }))
}

// == Stats ==

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<CacheStatsReport>> {
    Ok(Json(state.queries.cache_stats(None).await?))
}

/// Handler for GET /stats/:region
pub async fn region_stats_handler(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<Json<CacheStatsReport>> {
    Ok(Json(state.queries.cache_stats(Some(&region)).await?))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.registry.region_names().len(),
        state.catalog.kinds(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn state() -> AppState {
        AppState::from_config(&Config::default()).unwrap()
    }

    fn data(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    async fn upsert(state: &AppState, id: &str, title: &str) -> Document {
        let req = UpsertRequest { data: data(json!({"title": title, "status": "published"})) };
        let Json(doc) = upsert_entity_handler(
            State(state.clone()),
            Path(("template".to_string(), id.to_string())),
            Json(req),
        )
        .await
        .unwrap();
        doc
    }

    #[tokio::test]
    async fn test_upsert_and_get_handler() {
        let state = state();
        upsert(&state, "t1", "Ladder safety").await;

        let Json(doc) = get_entity_handler(
            State(state),
            Path(("template".to_string(), "t1".to_string())),
            Query(FieldsParams::default()),
        )
        .await
        .unwrap();
        assert_eq!(doc.data["title"], json!("Ladder safety"));
    }

    #[tokio::test]
    async fn test_get_missing_document() {
        let result = get_entity_handler(
            State(state()),
            Path(("template".to_string(), "nope".to_string())),
            Query(FieldsParams::default()),
        )
        .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let result = list_handler(
            State(state()),
            Path("permit".to_string()),
            Json(ListRequest { page_size: 10, ..Default::default() }),
        )
        .await;
        assert!(matches!(result, Err(ServiceError::UnknownEntityKind(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        upsert(&state, "t1", "Ladder safety").await;

        let Json(resp) = delete_entity_handler(
            State(state.clone()),
            Path(("template".to_string(), "t1".to_string())),
        )
        .await
        .unwrap();
        assert!(resp.deleted);

        let result = get_entity_handler(
            State(state),
            Path(("template".to_string(), "t1".to_string())),
            Query(FieldsParams::default()),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_notify_invalid_request() {
        let req = NotifyRequest {
            entity_kind: String::new(),
            document_id: None,
        };
        let result = notify_handler(State(state()), Json(req)).await;
        assert!(matches!(result, Err(ServiceError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_stats_handler_lists_every_region() {
        let state = state();
        let Json(report) = stats_handler(State(state.clone())).await.unwrap();
        assert_eq!(report.regions.len(), state.registry.region_names().len());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.regions, 5);
        assert_eq!(response.entity_kinds, vec!["assessment", "hazard_library", "template"]);
    }
}
