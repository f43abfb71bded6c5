//! Entity Module
//!
//! Per-kind list/get/batch-get reads with projection and cursor pagination.

mod cursor;
mod reader;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use cursor::Cursor;
pub use reader::{EntityReader, ListRequest, Page, MAX_PAGE_SIZE};

use crate::config::Config;
use crate::error::{Result, ServiceError};
use crate::query::InstrumentedQuery;
use crate::store::DocumentStore;

// == Entity Catalog ==
/// One reader per configured entity kind.
#[derive(Default)]
pub struct EntityCatalog {
    readers: BTreeMap<String, Arc<EntityReader>>,
}

impl EntityCatalog {
    /// Builds a reader for every entity policy. Each reader also clears its
    /// kind's entries from the search results region on write.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        queries: Arc<InstrumentedQuery>,
    ) -> Self {
        let readers = config
            .entities
            .iter()
            .map(|policy| {
                let reader = EntityReader::new(policy.clone(), store.clone(), queries.clone())
                    .with_dependent_region(config.search.results_region.clone());
                (policy.kind.clone(), Arc::new(reader))
            })
            .collect();
        Self { readers }
    }

    pub fn reader(&self, kind: &str) -> Result<Arc<EntityReader>> {
        self.readers
            .get(kind)
            .cloned()
            .ok_or_else(|| ServiceError::UnknownEntityKind(kind.to_string()))
    }

    pub fn kinds(&self) -> Vec<String> {
        self.readers.keys().cloned().collect()
    }
}
