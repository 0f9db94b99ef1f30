//! Structured error types for rezsync.
//!
//! Backend `Failure` outcomes are values, not errors: they only become a
//! [`SyncError::Backend`] when a caller decides to escalate them.

/// All errors that can occur while fetching, normalizing, and reconciling.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Missing credential or endpoint. Fatal, raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input (missing option, unknown sheet, bad locator).
    #[error("{0}")]
    Validation(String),

    /// Backend data the normalizer cannot interpret.
    #[error("Unexpected result shape: {0}")]
    Shape(String),

    /// A match criterion names a column that is not in the header row.
    #[error("Failed while trying to match against column that does not exist in sheet: {0}")]
    UnknownColumn(String),

    /// Dispatch received an action with no registered handler.
    #[error("Invalid action: {0}")]
    UnsupportedAction(String),

    /// A backend failure escalated by a caller.
    #[error("Backend request failed ({}): {message}", status.map_or_else(|| "transport".to_string(), |s| s.to_string()))]
    Backend {
        status: Option<u16>,
        message: String,
    },

    /// Row/column/sheet operation outside the sheet's extent.
    #[error("Range error: {0}")]
    Range(String),

    /// Reference-table text produced a pattern that does not compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON (de)serialization.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error must stop a whole batch rather than a single job.
    #[must_use]
    pub fn is_fatal_to_batch(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<quick_xml::events::attributes::AttrError> for SyncError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(quick_xml::Error::InvalidAttr(e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = SyncError::Backend {
            status: Some(500),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "Backend request failed (500): boom");

        let err = SyncError::Backend {
            status: None,
            message: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Backend request failed (transport): connection refused"
        );
    }

    #[test]
    fn test_only_configuration_is_fatal_to_batch() {
        assert!(SyncError::configuration("no token").is_fatal_to_batch());
        assert!(!SyncError::validation("bad").is_fatal_to_batch());
        assert!(!SyncError::Shape("x".into()).is_fatal_to_batch());
    }
}
