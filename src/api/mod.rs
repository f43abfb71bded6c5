//! API Module
//!
//! HTTP handlers and routing for the cache and search REST API.
//!
//! # Endpoints
//! - `POST /query` - Cached list read described by a query descriptor
//! - `POST /search` - Ranked, faceted, paginated search
//! - `GET /suggest` / `DELETE /suggest` - Query suggestions, reset
//! - `POST /notify` - Post-write invalidation hook
//! - `GET|PUT|DELETE /entities/:kind/:id` - Single document read and writes
//! - `POST /entities/:kind/list` - Cursor-paginated list
//! - `POST /entities/:kind/batch` - Batch get
//! - `GET /stats`, `GET /stats/:region` - Cache statistics and latency
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
