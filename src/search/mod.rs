//! Search Module
//!
//! Text normalization, weighted ranking, facet tallies, suggestions and the
//! search service that ties them to entity reads and the results cache.

mod facets;
mod normalize;
mod ranking;
mod service;
mod suggestions;

pub use facets::{tally, Facets};
pub use normalize::{normalize, normalize_prefix, tokenize, NormalizedQuery, MIN_TOKEN_CHARS};
pub use ranking::{compare_ranked, match_quality, score, Scored};
pub use service::{
    SearchQuery, SearchResponse, SearchResultItem, SearchService, DEFAULT_SUGGESTIONS,
    MAX_SEARCH_PAGE,
};
pub use suggestions::{Suggestion, SuggestionTracker};
