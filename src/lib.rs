//! Risk Cache - bounded multi-region caching and search for risk-assessment data
//!
//! Entity reads go through an instrumented, per-kind cache region; search
//! ranks, facets and paginates candidates drawn through the same path.

pub mod api;
pub mod cache;
pub mod config;
pub mod entities;
pub mod error;
pub mod models;
pub mod query;
pub mod search;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{Result, ServiceError};
pub use tasks::spawn_cleanup_task;
