//! Ranked, faceted, paginated search over one entity kind.
//!
//! Candidates come from the entity reader (structured filters only, capped
//! at `max_candidates`); scoring, ordering, facets and pagination all happen
//! here. Beyond a few thousand candidates ranking throughput degrades, which
//! is why the cap exists and truncation is reported in the response.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::SearchPolicy;
use crate::entities::{Cursor, EntityCatalog, EntityReader, ListRequest, MAX_PAGE_SIZE};
use crate::error::{Result, ServiceError};
use crate::query::{kind_prefix, InstrumentedQuery, QueryOptions};
use crate::search::facets::{tally, Facets};
use crate::search::normalize::{normalize, normalize_prefix, NormalizedQuery};
use crate::search::ranking::{compare_ranked, score};
use crate::search::suggestions::{Suggestion, SuggestionTracker};
use crate::store::{compare_values, Document, Filter, SortDirection, SortSpec};

/// Page size bounds of a search request.
pub const MIN_SEARCH_PAGE: usize = 1;
pub const MAX_SEARCH_PAGE: usize = 100;
/// Default number of suggestions returned.
pub const DEFAULT_SUGGESTIONS: usize = 10;

fn default_page_size() -> usize {
    20
}

// == Search Query ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub entity_kind: String,
    /// Free text; may be empty for a filter-only search
    #[serde(default)]
    pub text: String,
    /// field -> accepted values
    #[serde(default)]
    pub filters: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<SortDirection>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl SearchQuery {
    pub fn new(entity_kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            text: text.into(),
            filters: BTreeMap::new(),
            sort_by: None,
            sort_order: None,
            page_size: default_page_size(),
            cursor: None,
        }
    }

    pub fn with_filter(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.insert(field.into(), values);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

// == Search Response ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub document_id: String,
    pub updated_at: i64,
    pub data: Map<String, Value>,
    /// In [0, 100]
    pub relevance_score: f64,
    pub matched_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<SearchResultItem>,
    pub facets: Facets,
    /// Set when the candidate set was capped; facets and totals are then partial
    pub facets_approximate: bool,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    /// Best-effort: exact only when the candidate set was not capped
    pub total_count: usize,
}

#[derive(Serialize)]
struct SearchKey<'a> {
    tokens: &'a [String],
    filters: &'a BTreeMap<String, Vec<Value>>,
    sort: &'a SortSpec,
    page_size: usize,
    cursor: &'a Option<String>,
}

// == Search Service ==
pub struct SearchService {
    catalog: Arc<EntityCatalog>,
    queries: Arc<InstrumentedQuery>,
    suggestions: SuggestionTracker,
    policy: SearchPolicy,
}

impl SearchService {
    pub fn new(
        catalog: Arc<EntityCatalog>,
        queries: Arc<InstrumentedQuery>,
        policy: SearchPolicy,
    ) -> Self {
        let suggestions =
            SuggestionTracker::new(queries.registry().clone(), policy.suggestions_region.clone());
        Self {
            catalog,
            queries,
            suggestions,
            policy,
        }
    }

    // == Search ==
    pub async fn search(&self, query: SearchQuery) -> Result<SearchResponse> {
        let mut filters = self.validate(&query)?;
        let reader = self.catalog.reader(&query.entity_kind)?;
        let normalized = normalize(&query.text);
        let sort = SortSpec::new(
            query
                .sort_by
                .clone()
                .unwrap_or_else(|| reader.policy().default_sort_field.clone()),
            query.sort_order.unwrap_or_default(),
        );
        for values in filters.values_mut() {
            values.sort_by(compare_values);
            values.dedup();
        }

        let key = format!(
            "{}search:{}",
            kind_prefix(&query.entity_kind),
            serde_json::to_string(&SearchKey {
                tokens: &normalized.tokens,
                filters: &filters,
                sort: &sort,
                page_size: query.page_size,
                cursor: &query.cursor,
            })?
        );

        let response: SearchResponse = self
            .queries
            .cached(&self.policy.results_region, key, QueryOptions::default(), || {
                self.execute(&reader, &normalized, &filters, &sort, &query)
            })
            .await?;

        if response.total_count > 0 && !normalized.is_filter_only() {
            if let Err(err) = self.suggestions.record(&normalized.text).await {
                warn!(error = %err, "Failed to record search suggestion");
            }
        }
        Ok(response)
    }

    fn validate(&self, query: &SearchQuery) -> Result<BTreeMap<String, Vec<Value>>> {
        if !(MIN_SEARCH_PAGE..=MAX_SEARCH_PAGE).contains(&query.page_size) {
            return Err(ServiceError::InvalidQuery(format!(
                "page_size must be between {} and {}, got {}",
                MIN_SEARCH_PAGE, MAX_SEARCH_PAGE, query.page_size
            )));
        }
        for (field, values) in &query.filters {
            if values.is_empty() {
                return Err(ServiceError::InvalidQuery(format!(
                    "filter '{}' has no values",
                    field
                )));
            }
            if values.len() > self.policy.max_filter_values {
                return Err(ServiceError::InvalidQuery(format!(
                    "filter '{}' has {} values, at most {} allowed",
                    field,
                    values.len(),
                    self.policy.max_filter_values
                )));
            }
        }
        Ok(query.filters.clone())
    }

    async fn execute(
        &self,
        reader: &EntityReader,
        normalized: &NormalizedQuery,
        filters: &BTreeMap<String, Vec<Value>>,
        sort: &SortSpec,
        query: &SearchQuery,
    ) -> Result<SearchResponse> {
        // Decode before retrieval so a bad cursor fails fast.
        let resume = match &query.cursor {
            Some(token) => {
                let cursor = Cursor::decode(token, sort)?;
                let score = cursor.score.ok_or_else(|| {
                    ServiceError::InvalidQuery("cursor carries no relevance score".to_string())
                })?;
                Some((score, cursor.value, cursor.id))
            }
            None => None,
        };

        let (candidates, truncated) = self.candidates(reader, filters, sort).await?;
        if truncated {
            debug!(
                kind = reader.kind(),
                max_candidates = self.policy.max_candidates,
                "Candidate set truncated; facets and totals are approximate"
            );
        }
        let facets = tally(&candidates, &reader.policy().facet_fields);

        let mut ranked: Vec<(f64, Vec<String>, Document)> = if normalized.is_filter_only() {
            candidates
                .into_iter()
                .map(|doc| (0.0, Vec::new(), doc))
                .collect()
        } else {
            let weights = &reader.policy().field_weights;
            candidates
                .into_iter()
                .filter_map(|doc| {
                    let scored = score(&doc, &normalized.tokens, weights);
                    (scored.score > 0.0).then_some((scored.score, scored.matched_fields, doc))
                })
                .collect()
        };
        ranked.sort_by(|a, b| compare_ranked(sort, (a.0, &a.2), (b.0, &b.2)));

        let start = match &resume {
            Some((score, value, id)) => ranked
                .iter()
                .position(|(s, _, doc)| {
                    after_position(sort, (*s, doc), (*score, value, id.as_str())) == Ordering::Greater
                })
                .unwrap_or(ranked.len()),
            None => 0,
        };
        let total_count = ranked.len();
        let end = (start + query.page_size).min(total_count);
        let has_more = end < total_count;

        let page = &ranked[start..end];
        let next_cursor = match page.last() {
            Some((score, _, doc)) if has_more => {
                Some(Cursor::after(doc, sort).with_score(*score).encode())
            }
            _ => None,
        };
        let items = page
            .iter()
            .map(|(score, matched, doc)| SearchResultItem {
                document_id: doc.id.clone(),
                updated_at: doc.updated_at,
                data: doc.data.clone(),
                relevance_score: *score,
                matched_fields: matched.clone(),
            })
            .collect();

        Ok(SearchResponse {
            items,
            facets,
            facets_approximate: truncated,
            next_cursor,
            has_more,
            total_count,
        })
    }

    /// Pages through the reader until exhaustion or `max_candidates`.
    async fn candidates(
        &self,
        reader: &EntityReader,
        filters: &BTreeMap<String, Vec<Value>>,
        sort: &SortSpec,
    ) -> Result<(Vec<Document>, bool)> {
        let store_filters: Vec<Filter> = filters
            .iter()
            .map(|(field, values)| match values.as_slice() {
                [single] => Filter::Eq {
                    field: field.clone(),
                    value: single.clone(),
                },
                _ => Filter::In {
                    field: field.clone(),
                    values: values.clone(),
                },
            })
            .collect();

        let max = self.policy.max_candidates;
        let mut docs = Vec::new();
        let mut cursor = None;
        loop {
            let remaining = max - docs.len();
            let page = reader
                .list(ListRequest {
                    filters: store_filters.clone(),
                    sort: Some(sort.clone()),
                    page_size: remaining.min(MAX_PAGE_SIZE),
                    cursor,
                    fields: None,
                })
                .await?;
            docs.extend(page.items);
            if !page.has_more {
                return Ok((docs, false));
            }
            if docs.len() >= max {
                return Ok((docs, true));
            }
            cursor = page.next_cursor;
        }
    }

    // == Suggestions ==
    pub async fn suggest(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<Suggestion>> {
        let limit = limit.unwrap_or(DEFAULT_SUGGESTIONS).clamp(1, MAX_SEARCH_PAGE);
        self.suggestions.top(&normalize_prefix(prefix), limit).await
    }

    pub async fn reset_suggestions(&self) -> Result<usize> {
        self.suggestions.reset().await
    }
}

/// Scores are rounded to two decimals; anything closer is the same score.
const SCORE_EPSILON: f64 = 1e-6;

/// Orders a ranked row against a cursor position under the ranked order.
fn after_position(sort: &SortSpec, row: (f64, &Document), cursor: (f64, &Value, &str)) -> Ordering {
    let by_score = if (cursor.0 - row.0).abs() < SCORE_EPSILON {
        Ordering::Equal
    } else {
        cursor.0.partial_cmp(&row.0).unwrap_or(Ordering::Equal)
    };
    by_score.then_with(|| {
        sort.compare_position(&row.1.sort_value(&sort.field), &row.1.id, cursor.1, cursor.2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_query_defaults() {
        let query: SearchQuery = serde_json::from_str(r#"{"entity_kind": "template"}"#).unwrap();
        assert_eq!(query.page_size, 20);
        assert!(query.text.is_empty());
        assert!(query.filters.is_empty());
        assert!(query.cursor.is_none());
    }

    #[test]
    fn test_after_position_orders_score_then_sort() {
        let sort = SortSpec::new("updated_at", SortDirection::Desc);
        let mut doc = Document::new("b", Map::new());
        doc.updated_at = 10;

        // Lower score comes later in ranked order.
        assert_eq!(
            after_position(&sort, (20.0, &doc), (30.0, &json!(5), "a")),
            Ordering::Greater
        );
        // Same score, newer document comes first.
        assert_eq!(
            after_position(&sort, (30.0, &doc), (30.0, &json!(5), "a")),
            Ordering::Less
        );
        // The cursor row itself is not after itself.
        assert_eq!(
            after_position(&sort, (30.0, &doc), (30.0 + 1e-9, &json!(10), "b")),
            Ordering::Equal
        );
    }
}
