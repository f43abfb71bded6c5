//! Error types for the cache and search layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::store::StoreError;

// == Service Error Enum ==
/// Unified error type for cache, query and search operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Caller error: bad page size, malformed cursor, too many filter values
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Backing store failed after its own retry policy was exhausted
    #[error("Backing store unavailable: {0}")]
    BackingStoreUnavailable(String),

    /// Entry larger than the region can ever hold. Internal, never surfaced to callers.
    #[error("Cache rejected entry '{key}' ({size_bytes} bytes > {max_bytes} bytes)")]
    CacheRejected {
        key: String,
        size_bytes: usize,
        max_bytes: usize,
    },

    /// No region registered under this name
    #[error("Unknown cache region: {0}")]
    UnknownRegion(String),

    /// No policy configured for this entity kind
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    /// Document not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidQuery(_) => "invalid_query",
            ServiceError::BackingStoreUnavailable(_) => "backing_store_unavailable",
            ServiceError::CacheRejected { .. } => "cache_rejected",
            ServiceError::UnknownRegion(_) => "unknown_region",
            ServiceError::UnknownEntityKind(_) => "unknown_entity_kind",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Config(_) => "config",
            ServiceError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ServiceError::BackingStoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::UnknownRegion(_) | ServiceError::UnknownEntityKind(_) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::CacheRejected { .. }
            | ServiceError::Config(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::BackingStoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Internal(format!("serialization failed: {}", err))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse::new(self.to_string(), self.code()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the service.
pub type Result<T> = std::result::Result<T, ServiceError>;
