use serde::{Deserialize, Serialize};

use super::{Record, Scalar};
use crate::error::{Result, SyncError};

/// A row of the backend's `RoomLocation` reference table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomLocation {
    pub id: i64,
    /// Building code (`Building Code` column).
    pub code: String,
    pub description: String,
    pub web_description: String,
}

impl RoomLocation {
    /// Build an entry from a backend record.
    ///
    /// Missing text fields become empty strings; a missing or non-numeric
    /// id is a shape error.
    ///
    /// # Errors
    /// Returns [`SyncError::Shape`] when `RoomLocationID` is absent.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_record(record: &Record) -> Result<Self> {
        let id = record
            .get("RoomLocationID")
            .and_then(Scalar::as_number)
            .ok_or_else(|| SyncError::Shape("RoomLocation record without RoomLocationID".into()))?;
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| record.get(k).and_then(Scalar::as_text))
                .unwrap_or_default()
                .to_string()
        };
        Ok(Self {
            id: id as i64,
            code: text(&["Building_Code", "Building Code"]),
            description: text(&["Description"]),
            web_description: text(&["WebDescription"]),
        })
    }

    /// The three textual fields, in matching-pattern order.
    #[must_use]
    pub fn match_texts(&self) -> [&str; 3] {
        [&self.web_description, &self.description, &self.code]
    }
}

/// Input accepted by the location resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    /// Exact `RoomLocationID`.
    Id(i64),
    /// Case-insensitive substring of code, description, or web description.
    Text(String),
}

impl From<i64> for LocationQuery {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for LocationQuery {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for LocationQuery {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
