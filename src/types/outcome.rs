use serde_json::Value;

use super::{Grid, Record};
use crate::error::{Result, SyncError};

/// What to ask the backend for.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    /// Raw query-language string sent to the query endpoint.
    Query(String),
    /// Named report, optionally with a parameter object.
    Report {
        report_id: String,
        request_body: Option<Value>,
    },
}

impl QuerySpec {
    #[must_use]
    pub fn report(report_id: impl Into<String>) -> Self {
        Self::Report {
            report_id: report_id.into(),
            request_body: None,
        }
    }

    /// Identifier used in logs: the report id, or the query text.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Query(q) => q,
            Self::Report { report_id, .. } => report_id,
        }
    }
}

/// Classified backend response.
///
/// `Empty` (the backend's explicit "no records" sentinel) and `Failure` are
/// deliberately distinct: callers render a placeholder for the former and
/// skip-and-log the latter.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome<T = Vec<Record>> {
    Success(T),
    Empty,
    Failure {
        /// HTTP status, `None` for transport errors.
        status: Option<u16>,
        message: String,
    },
}

impl<T> ResponseOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseOutcome<U> {
        match self {
            Self::Success(v) => ResponseOutcome::Success(f(v)),
            Self::Empty => ResponseOutcome::Empty,
            Self::Failure { status, message } => ResponseOutcome::Failure { status, message },
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Escalate a `Failure` into an error, keeping `Success`/`Empty`.
    ///
    /// # Errors
    /// Returns [`SyncError::Backend`] for `Failure`.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            Self::Success(v) => Ok(Some(v)),
            Self::Empty => Ok(None),
            Self::Failure { status, message } => Err(SyncError::Backend { status, message }),
        }
    }
}

impl ResponseOutcome<Vec<Record>> {
    /// Normalize a successful record set into a [`Grid`].
    ///
    /// A success with zero records becomes `Empty`.
    ///
    /// # Errors
    /// Propagates [`SyncError::Shape`] from the normalizer.
    pub fn into_grid(self) -> Result<ResponseOutcome<Grid>> {
        match self {
            Self::Success(records) => Ok(match crate::grid::records_to_grid(&records)? {
                Some(grid) => ResponseOutcome::Success(grid),
                None => ResponseOutcome::Empty,
            }),
            Self::Empty => Ok(ResponseOutcome::Empty),
            Self::Failure { status, message } => Ok(ResponseOutcome::Failure { status, message }),
        }
    }

    /// Number of records returned; `Empty` counts as zero.
    #[must_use]
    pub fn record_count(&self) -> Option<usize> {
        match self {
            Self::Success(records) => Some(records.len()),
            Self::Empty => Some(0),
            Self::Failure { .. } => None,
        }
    }
}
