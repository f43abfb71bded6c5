//! Response DTOs for the cache and search API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashSet;

use serde::Serialize;

use crate::search::Suggestion;
use crate::store::Document;

/// Response body for POST /entities/:kind/batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchGetResponse {
    pub items: Vec<Document>,
    /// Requested ids the store did not return
    pub missing: Vec<String>,
}

impl BatchGetResponse {
    pub fn new(requested: &[String], items: Vec<Document>) -> Self {
        let found: HashSet<&str> = items.iter().map(|doc| doc.id.as_str()).collect();
        let mut reported = HashSet::new();
        let missing = requested
            .iter()
            .filter(|id| !found.contains(id.as_str()) && reported.insert(id.as_str()))
            .cloned()
            .collect();
        Self { items, missing }
    }
}

/// Response body for DELETE /entities/:kind/:id
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub document_id: String,
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(document_id: impl Into<String>, deleted: bool) -> Self {
        let document_id = document_id.into();
        let message = if deleted {
            format!("Document '{}' deleted successfully", document_id)
        } else {
            format!("Document '{}' did not exist", document_id)
        };
        Self {
            message,
            document_id,
            deleted,
        }
    }
}

/// Response body for POST /notify and DELETE /suggest
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResponse {
    /// Cache entries removed
    pub invalidated: usize,
}

/// Response body for GET /suggest
#[derive(Debug, Clone, Serialize)]
pub struct SuggestResponse {
    pub prefix: String,
    pub suggestions: Vec<Suggestion>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Registered cache regions
    pub regions: usize,
    /// Configured entity kinds
    pub entity_kinds: Vec<String>,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(regions: usize, entity_kinds: Vec<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            regions,
            entity_kinds,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    /// Stable machine-readable error code
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_batch_response_reports_missing() {
        let requested = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let items = vec![Document::new("b", Map::new())];
        let resp = BatchGetResponse::new(&requested, items);
        assert_eq!(resp.missing, vec!["a", "c"]);
    }

    #[test]
    fn test_batch_response_reports_each_missing_id_once() {
        let requested: Vec<String> = ["a", "b", "a", "c", "b"].iter().map(|s| s.to_string()).collect();
        let resp = BatchGetResponse::new(&requested, Vec::new());
        assert_eq!(resp.missing, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_delete_response_message() {
        assert!(DeleteResponse::new("t1", true).message.contains("deleted"));
        assert!(DeleteResponse::new("t1", false).message.contains("did not exist"));
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(5, vec!["template".to_string()]);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("\"regions\":5"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong", "internal");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Something went wrong"));
        assert!(json.contains("\"code\":\"internal\""));
    }
}
