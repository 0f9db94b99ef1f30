use serde_json::{Map, Value};

use super::CellValue;
use crate::error::{Result, SyncError};

/// A scalar field value of a backend record.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    /// Strings, including ISO-8601-like timestamps.
    Text(String),
}

impl Scalar {
    /// Nested arrays/objects are kept as their JSON text.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map_or_else(|| Self::Text(n.to_string()), Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Strings stay text, other scalars keep their type.
    #[must_use]
    pub fn to_cell(&self) -> CellValue {
        match self {
            Self::Null => CellValue::Empty,
            Self::Bool(b) => CellValue::Boolean(*b),
            Self::Number(n) => CellValue::Number(*n),
            Self::Text(s) => CellValue::Text(s.clone()),
        }
    }
}

/// One backend row: an ordered list of field/value pairs.
///
/// Iteration order is the order the backend returned the fields in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Scalar)>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces the value of an existing key in place.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: Scalar) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Scalar) {
        let key = key.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        Self {
            fields: object
                .iter()
                .map(|(k, v)| (k.clone(), Scalar::from_json(v)))
                .collect(),
        }
    }

    /// Parse a JSON array of objects into records.
    ///
    /// # Errors
    /// Returns [`SyncError::Shape`] when the value is not an array of objects.
    pub fn many_from_json(value: &Value) -> Result<Vec<Self>> {
        let Value::Array(items) = value else {
            return Err(SyncError::Shape(format!(
                "expected an array of records, got {}",
                json_kind(value)
            )));
        };
        items
            .iter()
            .map(|item| match item {
                Value::Object(object) => Ok(Self::from_json_object(object)),
                other => Err(SyncError::Shape(format!(
                    "expected a record object, got {}",
                    json_kind(other)
                ))),
            })
            .collect()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Scalar> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
