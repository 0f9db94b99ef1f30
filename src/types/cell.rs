use chrono::NaiveDateTime;
use serde_json::Value;

/// Display format used for date cells and for the date-coercion pattern.
pub const DATE_DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell value as stored in a sheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    /// Calendar date-time (produced by audit date coercion).
    Date(NaiveDateTime),
}

impl CellValue {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Convert a JSON scalar into a cell value.
    ///
    /// Arrays and objects are stored as their JSON text.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => n
                .as_f64()
                .map_or_else(|| Self::Text(n.to_string()), Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }

    /// Exact comparison against a JSON criterion value. No type coercion:
    /// the text `"1"` does not match the number `1`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches_json(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Empty, Value::Null) => true,
            (Self::Empty, Value::String(s)) => s.is_empty(),
            (Self::Text(a), Value::String(b)) => a == b,
            (Self::Number(a), Value::Number(b)) => b.as_f64().is_some_and(|b| *a == b),
            (Self::Boolean(a), Value::Bool(b)) => a == b,
            (Self::Date(d), Value::String(s)) => d.format(DATE_DISPLAY_FORMAT).to_string() == *s,
            _ => false,
        }
    }

    /// Text shown for this value (numbers without a trailing `.0`).
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Self::Date(d) => d.format(DATE_DISPLAY_FORMAT).to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Render a number the way a spreadsheet shows it by default.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}
