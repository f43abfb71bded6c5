//! Request DTOs for the cache and search API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::entities::{ListRequest, MAX_PAGE_SIZE};
use crate::query::QueryDescriptor;

/// Longest accepted document id.
pub const MAX_ID_LEN: usize = 256;

fn validate_id(id: &str) -> Option<String> {
    if id.is_empty() {
        return Some("document id cannot be empty".to_string());
    }
    if id.len() > MAX_ID_LEN {
        return Some(format!("document id exceeds {} characters", MAX_ID_LEN));
    }
    None
}

/// Request body for POST /notify
///
/// Sent by write paths that bypass this service, after their write was
/// acknowledged by the backing store.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyRequest {
    pub entity_kind: String,
    #[serde(default)]
    pub document_id: Option<String>,
}

impl NotifyRequest {
    pub fn validate(&self) -> Option<String> {
        if self.entity_kind.is_empty() {
            return Some("entity_kind cannot be empty".to_string());
        }
        self.document_id.as_deref().and_then(validate_id)
    }
}

/// Request body for POST /entities/:kind/batch
#[derive(Debug, Clone, Deserialize)]
pub struct BatchGetRequest {
    pub ids: Vec<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

impl BatchGetRequest {
    pub fn validate(&self) -> Option<String> {
        if self.ids.is_empty() {
            return Some("ids cannot be empty".to_string());
        }
        if self.ids.len() > MAX_PAGE_SIZE {
            return Some(format!("at most {} ids per batch", MAX_PAGE_SIZE));
        }
        self.ids.iter().find_map(|id| validate_id(id))
    }
}

/// Request body for PUT /entities/:kind/:id
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertRequest {
    pub data: Map<String, Value>,
}

/// Query string of GET /entities/:kind/:id
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldsParams {
    /// Comma-separated projected fields
    #[serde(default)]
    pub fields: Option<String>,
}

impl FieldsParams {
    pub fn field_list(&self) -> Option<Vec<String>> {
        self.fields.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Query string of GET /suggest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Converts a descriptor from POST /query into an entity list request.
impl From<QueryDescriptor> for ListRequest {
    fn from(descriptor: QueryDescriptor) -> Self {
        ListRequest {
            filters: descriptor.filters,
            sort: descriptor.sort,
            page_size: descriptor.page_size,
            cursor: descriptor.cursor,
            fields: descriptor.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_request_deserialize() {
        let req: NotifyRequest = serde_json::from_str(r#"{"entity_kind": "template"}"#).unwrap();
        assert_eq!(req.entity_kind, "template");
        assert!(req.document_id.is_none());
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_notify_request_empty_kind() {
        let req = NotifyRequest {
            entity_kind: String::new(),
            document_id: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_batch_request_limits() {
        let empty = BatchGetRequest { ids: vec![], fields: None };
        assert!(empty.validate().is_some());

        let too_many = BatchGetRequest {
            ids: (0..=MAX_PAGE_SIZE).map(|i| i.to_string()).collect(),
            fields: None,
        };
        assert!(too_many.validate().is_some());

        let blank_id = BatchGetRequest { ids: vec!["a".into(), "".into()], fields: None };
        assert!(blank_id.validate().is_some());
    }

    #[test]
    fn test_fields_params_split() {
        let params = FieldsParams { fields: Some("title, status,,".to_string()) };
        assert_eq!(params.field_list(), Some(vec!["title".to_string(), "status".to_string()]));
        assert_eq!(FieldsParams::default().field_list(), None);
    }

    #[test]
    fn test_descriptor_into_list_request() {
        let descriptor: QueryDescriptor = serde_json::from_str(
            r#"{"entity_kind": "template", "page_size": 5, "fields": ["title"]}"#,
        )
        .unwrap();
        let request = ListRequest::from(descriptor);
        assert_eq!(request.page_size, 5);
        assert_eq!(request.fields, Some(vec!["title".to_string()]));
    }
}
