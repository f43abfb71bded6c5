//! Request and Response models for the HTTP API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.
//! Search and list payloads reuse the service types directly.

pub mod requests;
pub mod responses;

pub use requests::{BatchGetRequest, FieldsParams, NotifyRequest, SuggestParams, UpsertRequest};
pub use responses::{
    BatchGetResponse, DeleteResponse, ErrorResponse, HealthResponse, InvalidationResponse,
    SuggestResponse,
};
