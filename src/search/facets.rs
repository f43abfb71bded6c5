//! Facet tallies over a candidate set.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::store::Document;

/// field -> value -> count
pub type Facets = BTreeMap<String, BTreeMap<String, u64>>;

fn facet_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Counts distinct values of each facet field across `docs`. Array fields
/// count every element once per document.
pub fn tally<'a>(docs: impl IntoIterator<Item = &'a Document>, fields: &[String]) -> Facets {
    let mut facets: Facets = fields
        .iter()
        .map(|f| (f.clone(), BTreeMap::new()))
        .collect();

    for doc in docs {
        for field in fields {
            let Some(value) = doc.field(field) else {
                continue;
            };
            let mut keys: Vec<String> = match &value {
                Value::Array(items) => items.iter().filter_map(facet_key).collect(),
                other => facet_key(other).into_iter().collect(),
            };
            keys.sort();
            keys.dedup();

            let counts = facets.entry(field.clone()).or_default();
            for key in keys {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
    }
    facets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        match data {
            Value::Object(map) => Document::new(id, map),
            _ => Document::new(id, Default::default()),
        }
    }

    #[test]
    fn test_tally_counts_values_and_array_elements() {
        let docs = vec![
            doc("a", json!({"status": "published", "tags": ["height", "ladder"]})),
            doc("b", json!({"status": "draft", "tags": ["height", "height"]})),
            doc("c", json!({"status": "published"})),
        ];
        let facets = tally(&docs, &["status".to_string(), "tags".to_string(), "site".to_string()]);

        assert_eq!(facets["status"]["published"], 2);
        assert_eq!(facets["status"]["draft"], 1);
        assert_eq!(facets["tags"]["height"], 2);
        assert_eq!(facets["tags"]["ladder"], 1);
        assert!(facets["site"].is_empty());
    }
}
