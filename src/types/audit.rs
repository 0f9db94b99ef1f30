use serde::Deserialize;

use super::Record;

/// A named query that is expected to return zero rows.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub query: String,
}

/// Result of one audit test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Pass,
    Fail,
    /// The backend call failed; no verdict.
    Error,
}

impl AuditStatus {
    /// Glyph written into the summary sheet.
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Pass => "✔",
            Self::Fail => "✘",
            Self::Error => "⚠",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditResult {
    pub name: String,
    pub status: AuditStatus,
    /// Offending records (only for `Fail`).
    pub records: Vec<Record>,
    /// Backend failure message (only for `Error`).
    pub error: Option<String>,
}
