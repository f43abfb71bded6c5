//! Documents, filters and ordering shared by the backing store and the read path.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// == Document ==
/// A stored document: stable id, monotonic modification timestamp, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Modification timestamp (Unix milliseconds), assigned by the store
    pub updated_at: i64,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            updated_at: 0,
            data,
        }
    }

    /// Value of a field. `id` and `updated_at` resolve to the envelope fields.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "updated_at" => Some(Value::from(self.updated_at)),
            _ => self.data.get(name).cloned(),
        }
    }

    /// Sort key for `field`; missing fields sort as null.
    pub fn sort_value(&self, field: &str) -> Value {
        self.field(field).unwrap_or(Value::Null)
    }

    /// Copy of this document restricted to `fields` (envelope always kept).
    pub fn project(&self, fields: &[String]) -> Document {
        let data = self
            .data
            .iter()
            .filter(|(k, _)| fields.iter().any(|f| f == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Document {
            id: self.id.clone(),
            updated_at: self.updated_at,
            data,
        }
    }
}

// == Sort ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Total order over documents: sort field in the requested direction,
    /// then id ascending.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        self.compare_position(&a.sort_value(&self.field), &a.id, &b.sort_value(&self.field), &b.id)
    }

    /// Same order over bare `(sort value, id)` positions, as carried by cursors.
    pub fn compare_position(&self, a_val: &Value, a_id: &str, b_val: &Value, b_id: &str) -> Ordering {
        let by_value = compare_values(a_val, b_val);
        let by_value = match self.direction {
            SortDirection::Asc => by_value,
            SortDirection::Desc => by_value.reverse(),
        };
        by_value.then_with(|| a_id.cmp(b_id))
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Orders JSON values: null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// == Filter ==
/// Equality, membership, prefix and range predicates over one field.
///
/// Array-valued fields match when any element matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    Prefix { field: String, prefix: String },
    Range {
        field: String,
        #[serde(default)]
        gte: Option<Value>,
        #[serde(default)]
        lt: Option<Value>,
    },
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Filter::Eq { field, .. }
            | Filter::In { field, .. }
            | Filter::Prefix { field, .. }
            | Filter::Range { field, .. } => field,
        }
    }

    /// Sorts `In` values so logically equal filters compare equal.
    pub fn canonicalize(&mut self) {
        if let Filter::In { values, .. } = self {
            values.sort_by(compare_values);
            values.dedup();
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        let Some(value) = doc.field(self.field()) else {
            return false;
        };
        match &value {
            Value::Array(items) => items.iter().any(|item| self.matches_scalar(item)),
            scalar => self.matches_scalar(scalar),
        }
    }

    fn matches_scalar(&self, v: &Value) -> bool {
        match self {
            Filter::Eq { value, .. } => v == value,
            Filter::In { values, .. } => values.iter().any(|candidate| candidate == v),
            Filter::Prefix { prefix, .. } => v.as_str().is_some_and(|s| s.starts_with(prefix.as_str())),
            Filter::Range { gte, lt, .. } => {
                let above = gte
                    .as_ref()
                    .map_or(true, |lo| compare_values(v, lo) != Ordering::Less);
                let below = lt
                    .as_ref()
                    .map_or(true, |hi| compare_values(v, hi) == Ordering::Less);
                above && below
            }
        }
    }
}
