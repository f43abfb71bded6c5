//! Query descriptors and deterministic cache keys.

use serde::{Deserialize, Serialize};

use crate::store::{Filter, SortSpec};

// == Query Descriptor ==
/// Everything that determines the rows a read returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub entity_kind: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    pub page_size: usize,
    #[serde(default)]
    pub cursor: Option<String>,
    /// Projected fields; None means the whole document
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

impl QueryDescriptor {
    pub fn new(entity_kind: impl Into<String>, page_size: usize) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            filters: Vec::new(),
            sort: None,
            page_size,
            cursor: None,
            fields: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_fields(mut self, fields: Option<Vec<String>>) -> Self {
        self.fields = fields;
        self
    }

    /// Copy with filters ordered by field, filter values sorted and
    /// projected fields sorted, so logically identical queries compare equal.
    pub fn canonical(&self) -> Self {
        let mut canonical = self.clone();
        for filter in &mut canonical.filters {
            filter.canonicalize();
        }
        canonical.filters.sort_by_cached_key(|f| {
            (
                f.field().to_string(),
                serde_json::to_string(f).unwrap_or_default(),
            )
        });
        if let Some(fields) = &mut canonical.fields {
            fields.sort();
            fields.dedup();
        }
        canonical
    }

    /// Deterministic cache key: `<entity_kind>:<canonical JSON>`.
    ///
    /// The kind prefix is what write-triggered invalidation matches on.
    pub fn cache_key(&self) -> String {
        let canonical = self.canonical();
        let body = serde_json::to_string(&KeyBody {
            filters: &canonical.filters,
            sort: &canonical.sort,
            page_size: canonical.page_size,
            cursor: &canonical.cursor,
            fields: &canonical.fields,
        })
        .unwrap_or_default();
        format!("{}{}", kind_prefix(&self.entity_kind), body)
    }
}

#[derive(Serialize)]
struct KeyBody<'a> {
    filters: &'a [Filter],
    sort: &'a Option<SortSpec>,
    page_size: usize,
    cursor: &'a Option<String>,
    fields: &'a Option<Vec<String>>,
}

/// Key prefix shared by every cached read of `entity_kind`.
pub fn kind_prefix(entity_kind: &str) -> String {
    format!("{}:", entity_kind)
}
