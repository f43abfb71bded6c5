//! Weighted field-match scoring.
//!
//! For every token, each configured field contributes `weight * quality`,
//! where quality is 1.0 for an exact word match, 0.6 for a word prefix and
//! 0.3 for a substring anywhere in the field. The sum is scaled against the
//! best possible score into [0, 100].

use std::cmp::Ordering;

use serde_json::Value;

use crate::config::FieldWeight;
use crate::search::normalize::tokenize;
use crate::store::{Document, SortSpec};

pub const EXACT: f64 = 1.0;
pub const PREFIX: f64 = 0.6;
pub const SUBSTRING: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub score: f64,
    /// Fields that contributed, in weight order
    pub matched_fields: Vec<String>,
}

/// Flattens a field value into lower-cased text fragments.
fn field_texts(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.to_lowercase()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(field_texts).collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

/// Best match quality of `token` within one field value.
pub fn match_quality(value: &Value, token: &str) -> f64 {
    let mut best: f64 = 0.0;
    for text in field_texts(value) {
        for word in tokenize(&text) {
            if word == token {
                return EXACT;
            }
            if word.starts_with(token) {
                best = best.max(PREFIX);
            }
        }
        if best < SUBSTRING && text.contains(token) {
            best = SUBSTRING;
        }
    }
    best
}

/// Scores one document. `tokens` must be non-empty and `weights` positive.
pub fn score(doc: &Document, tokens: &[String], weights: &[FieldWeight]) -> Scored {
    let max: f64 = weights.iter().map(|w| w.weight).sum::<f64>() * tokens.len() as f64;
    if max <= 0.0 {
        return Scored {
            score: 0.0,
            matched_fields: Vec::new(),
        };
    }

    let mut total = 0.0;
    let mut matched_fields = Vec::new();
    for weight in weights {
        let Some(value) = doc.field(&weight.field) else {
            continue;
        };
        let field_total: f64 = tokens
            .iter()
            .map(|token| weight.weight * match_quality(&value, token))
            .sum();
        if field_total > 0.0 {
            total += field_total;
            matched_fields.push(weight.field.clone());
        }
    }

    Scored {
        score: round2((total / max * 100.0).clamp(0.0, 100.0)),
        matched_fields,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Result order: score descending, then the requested sort, then id ascending.
pub fn compare_ranked(sort: &SortSpec, a: (f64, &Document), b: (f64, &Document)) -> Ordering {
    b.0.partial_cmp(&a.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| sort.compare(a.1, b.1))
}
