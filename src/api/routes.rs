//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_get_handler, delete_entity_handler, get_entity_handler, health_handler, list_handler,
    notify_handler, query_handler, region_stats_handler, reset_suggestions_handler,
    search_handler, stats_handler, suggest_handler, upsert_entity_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(query_handler))
        .route("/search", post(search_handler))
        .route("/suggest", get(suggest_handler).delete(reset_suggestions_handler))
        .route("/notify", post(notify_handler))
        .route("/entities/:kind/list", post(list_handler))
        .route("/entities/:kind/batch", post(batch_get_handler))
        .route(
            "/entities/:kind/:id",
            get(get_entity_handler)
                .put(upsert_entity_handler)
                .delete(delete_entity_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/stats/:region", get(region_stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
