//! Query text normalization.

use serde::Serialize;

/// Shortest token kept for scoring.
pub const MIN_TOKEN_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery {
    /// Tokens joined by single spaces; the suggestion key
    pub text: String,
    /// Distinct scoring tokens in query order
    pub tokens: Vec<String>,
}

impl NormalizedQuery {
    /// No tokens left to score: results come from filters alone.
    pub fn is_filter_only(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Lower-cases, trims and splits on anything that is not alphanumeric.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Normalizes raw query text. Queries shorter than two characters, and queries
/// whose every token is shorter than two characters, become filter-only.
pub fn normalize(raw: &str) -> NormalizedQuery {
    let trimmed = raw.trim();
    if trimmed.chars().count() < MIN_TOKEN_CHARS {
        return NormalizedQuery {
            text: String::new(),
            tokens: Vec::new(),
        };
    }

    let mut tokens: Vec<String> = Vec::new();
    for token in tokenize(trimmed) {
        if token.chars().count() >= MIN_TOKEN_CHARS && !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    NormalizedQuery {
        text: tokens.join(" "),
        tokens,
    }
}

/// Normalizes a suggestion prefix: lower-case, trimmed, inner whitespace
/// collapsed. Partial trailing words are kept.
pub fn normalize_prefix(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
