//! How the ordering core reads content items.
//!
//! The engine never inspects an item's shape. It goes through [`ContentItem`],
//! which every collection type implements once: typed structs return their
//! fields directly, [`Entry`] delegates to its `data` payload, and
//! [`serde_json::Value`] looks at the object itself first and then at its
//! nested `data` object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scalar compared by collection filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Strict equality, except that integers and floats compare numerically.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Float(b))
            | (FieldValue::Float(b), FieldValue::Int(a)) => (*a as f64) == *b,
            _ => self == other,
        }
    }

    /// Convert a JSON scalar. Arrays, objects and `null` have no scalar form.
    pub fn from_json(value: &Value) -> Option<FieldValue> {
        match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Read access to the keys the ordering core sorts and filters on.
///
/// All methods default to `None`, so a type only overrides what it carries.
pub trait ContentItem {
    /// Manual placement: `>= 0` pins to the front, `< 0` pins to the end.
    fn order(&self) -> Option<i64> {
        None
    }

    /// Date token (`"YYYY-MM"`, `"YYYY"`, `"present"`).
    fn date(&self) -> Option<&str> {
        None
    }

    /// Named scalar field for filter matching.
    fn field(&self, _name: &str) -> Option<FieldValue> {
        None
    }
}

impl<T: ContentItem + ?Sized> ContentItem for &T {
    fn order(&self) -> Option<i64> {
        (**self).order()
    }

    fn date(&self) -> Option<&str> {
        (**self).date()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        (**self).field(name)
    }
}

/// Look up `key` on a JSON object, falling back to its `data` object when
/// the key is absent or `null` at the top level.
pub fn json_lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .get(key)
        .filter(|v| !v.is_null())
        .or_else(|| value.get("data")?.get(key).filter(|v| !v.is_null()))
}

/// Integral JSON number stored under `key` (own field or `data`).
///
/// Whole-valued floats such as `2.0` count as integers.
pub fn json_order(value: &Value, key: &str) -> Option<i64> {
    let number = json_lookup(value, key)?;
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// String stored under `key` (own field or `data`).
pub fn json_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    json_lookup(value, key).and_then(Value::as_str)
}

impl ContentItem for Value {
    fn order(&self) -> Option<i64> {
        json_order(self, "order")
    }

    fn date(&self) -> Option<&str> {
        json_str(self, "date")
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        json_lookup(self, name).and_then(FieldValue::from_json)
    }
}

/// A collection entry as handed out by a content store: an identifier plus
/// the validated frontmatter in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<D> {
    pub id: String,
    pub collection: String,
    pub data: D,
}

impl<D> Entry<D> {
    pub fn new(id: impl Into<String>, collection: impl Into<String>, data: D) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            data,
        }
    }
}

impl<D: ContentItem> ContentItem for Entry<D> {
    fn order(&self) -> Option<i64> {
        self.data.order()
    }

    fn date(&self) -> Option<&str> {
        self.data.date()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(FieldValue::Text(self.id.clone())),
            "collection" => Some(FieldValue::Text(self.collection.clone())),
            _ => self.data.field(name),
        }
    }
}
