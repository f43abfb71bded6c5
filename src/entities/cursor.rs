//! Opaque pagination cursors.
//!
//! A cursor carries the sort position `(sort value, id)` of the last row of
//! the previous page, plus the sort it was produced under so it cannot be
//! replayed against a different ordering.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ServiceError};
use crate::store::{Document, SortSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub sort: SortSpec,
    pub value: Value,
    pub id: String,
    /// Relevance score of the last row, for ranked result pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Cursor {
    /// Position just after `doc` under `sort`.
    pub fn after(doc: &Document, sort: &SortSpec) -> Self {
        Self {
            sort: sort.clone(),
            value: doc.sort_value(&sort.field),
            id: doc.id.clone(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn encode(&self) -> String {
        // Serializing a plain struct of JSON values cannot fail.
        let raw = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Decodes a token and checks it was issued for `sort`.
    pub fn decode(token: &str, sort: &SortSpec) -> Result<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ServiceError::InvalidQuery("malformed cursor".to_string()))?;
        let cursor: Cursor = serde_json::from_slice(&raw)
            .map_err(|_| ServiceError::InvalidQuery("malformed cursor".to_string()))?;
        if &cursor.sort != sort {
            return Err(ServiceError::InvalidQuery(
                "cursor was issued for a different sort order".to_string(),
            ));
        }
        Ok(cursor)
    }

    pub fn into_start_after(self) -> (Value, String) {
        (self.value, self.id)
    }
}
