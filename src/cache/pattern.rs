//! Key Pattern Module
//!
//! Matchers used by region invalidation.

use serde::Deserialize;

// == Key Pattern ==
/// Selects the keys removed by an invalidation.
///
/// Keys embed the entity kind and the canonical filter parameters, so a
/// prefix or substring match over-removes rather than under-removes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum KeyPattern {
    /// Exactly one key
    Exact(String),
    /// Every key starting with the given text
    Prefix(String),
    /// Every key containing the given text anywhere
    Contains(String),
    /// Every key in the region
    All,
}

impl KeyPattern {
    /// Returns true if `key` is selected by this pattern.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Exact(k) => key == k,
            KeyPattern::Prefix(p) => key.starts_with(p.as_str()),
            KeyPattern::Contains(s) => key.contains(s.as_str()),
            KeyPattern::All => true,
        }
    }
}
