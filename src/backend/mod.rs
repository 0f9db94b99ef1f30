//! Backend query/report client.
//!
//! Every call is a single attempt. Transport errors and non-2xx responses
//! come back as [`ResponseOutcome::Failure`] so callers can decide whether
//! to skip, log, or retry; only missing configuration is an `Err`.

pub mod http;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CredentialProvider;
use crate::error::{Result, SyncError};
use crate::grid::payload_records;
use crate::types::{QuerySpec, ResponseOutcome};

use self::http::{HttpClient, HttpRequest, HttpResponse, Method};

/// Application-error description the backend uses for "zero rows".
pub const NO_RECORDS_SENTINEL: &str =
    "Error rendering report: There aren't any records to display";

pub const QUERY_PATH: &str = "/services/query";
pub const REPORT_PATH: &str = "/services/getreport";

/// Anything that can run queries and reports.
pub trait Backend {
    /// Run a raw query-language string.
    ///
    /// # Errors
    /// [`SyncError::Configuration`] when credentials or endpoint are missing;
    /// [`SyncError::Shape`] when a successful body is not a record array.
    fn execute_query(&self, query: &str) -> Result<ResponseOutcome>;

    /// Fetch a named report, with an optional parameter object.
    ///
    /// # Errors
    /// Same as [`Backend::execute_query`].
    fn execute_report(&self, report_id: &str, request_body: Option<&Value>)
        -> Result<ResponseOutcome>;

    /// # Errors
    /// Same as [`Backend::execute_query`].
    fn execute(&self, spec: &QuerySpec) -> Result<ResponseOutcome> {
        match spec {
            QuerySpec::Query(query) => self.execute_query(query),
            QuerySpec::Report {
                report_id,
                request_body,
            } => self.execute_report(report_id, request_body.as_ref()),
        }
    }
}

impl<T: Backend + ?Sized> Backend for &T {
    fn execute_query(&self, query: &str) -> Result<ResponseOutcome> {
        (**self).execute_query(query)
    }

    fn execute_report(
        &self,
        report_id: &str,
        request_body: Option<&Value>,
    ) -> Result<ResponseOutcome> {
        (**self).execute_report(report_id, request_body)
    }
}

/// REST client for the query and report endpoints.
pub struct BackendClient<H, C> {
    http: H,
    credentials: C,
}

impl<H: HttpClient, C: CredentialProvider> BackendClient<H, C> {
    pub fn new(http: H, credentials: C) -> Self {
        Self { http, credentials }
    }

    /// Authorization header and endpoint base, or a configuration error.
    fn context(&self) -> Result<(String, String)> {
        let authorization = self.credentials.authorization().ok_or_else(|| {
            SyncError::configuration(
                "credentials could not be found; run `rezsync configure credentials`",
            )
        })?;
        let base = self.credentials.endpoint_base().ok_or_else(|| {
            SyncError::configuration(
                "API endpoint could not be found; run `rezsync configure endpoint`",
            )
        })?;
        Ok((authorization, base.trim_end_matches('/').to_string()))
    }

    fn send(&self, label: &str, request: &HttpRequest) -> Result<ResponseOutcome> {
        debug!(url = %request.url, method = ?request.method, label, "Calling backend");
        let outcome = match self.http.fetch(request) {
            Ok(response) => classify(response)?,
            Err(e) => ResponseOutcome::Failure {
                status: None,
                message: e.to_string(),
            },
        };
        if let ResponseOutcome::Failure { status, message } = &outcome {
            warn!(label, ?status, %message, "Backend request failed");
        }
        Ok(outcome)
    }
}

impl<H: HttpClient, C: CredentialProvider> Backend for BackendClient<H, C> {
    fn execute_query(&self, query: &str) -> Result<ResponseOutcome> {
        let (authorization, base) = self.context()?;
        let request = HttpRequest {
            method: Method::Post,
            url: format!("{base}{QUERY_PATH}"),
            headers: default_headers(authorization),
            content_type: Some("text/plain".into()),
            body: Some(query.to_string()),
        };
        self.send(query, &request)
    }

    fn execute_report(
        &self,
        report_id: &str,
        request_body: Option<&Value>,
    ) -> Result<ResponseOutcome> {
        let report_id = report_id.trim();
        if report_id.is_empty() {
            return Err(SyncError::validation(
                "\"reportId\" is required, but was not defined.",
            ));
        }
        let (authorization, base) = self.context()?;
        let (method, content_type, body) = match request_body {
            Some(body) => (
                Method::Post,
                Some("application/json".to_string()),
                Some(serde_json::to_string(body)?),
            ),
            None => (Method::Get, None, None),
        };
        let request = HttpRequest {
            method,
            url: format!("{base}{REPORT_PATH}/{report_id}"),
            headers: default_headers(authorization),
            content_type,
            body,
        };
        self.send(report_id, &request)
    }
}

/// Application-error element returned on non-2xx responses.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    description: Option<String>,
}

fn default_headers(authorization: String) -> Vec<(String, String)> {
    vec![
        ("Accept".into(), "application/json".into()),
        ("Authorization".into(), authorization),
    ]
}

/// Map a raw response onto success / empty / failure.
///
/// # Errors
/// [`SyncError::Shape`] when a 2xx body is JSON but neither a record array
/// nor tabular output.
pub fn classify(response: HttpResponse) -> Result<ResponseOutcome> {
    let HttpResponse { status, body } = response;

    if (200..300).contains(&status) {
        if body.trim().is_empty() {
            return Ok(ResponseOutcome::Empty);
        }
        return match serde_json::from_str::<Value>(&body) {
            Ok(Value::Null) => Ok(ResponseOutcome::Empty),
            Ok(value) => Ok(ResponseOutcome::Success(payload_records(&value)?)),
            Err(e) => Ok(ResponseOutcome::Failure {
                status: Some(status),
                message: format!("unparsable response body: {e}"),
            }),
        };
    }

    match serde_json::from_str::<Vec<BackendErrorBody>>(&body) {
        Ok(errors) => {
            let description = errors.into_iter().next().and_then(|e| e.description);
            if description.as_deref() == Some(NO_RECORDS_SENTINEL) {
                return Ok(ResponseOutcome::Empty);
            }
            Ok(ResponseOutcome::Failure {
                status: Some(status),
                message: description.unwrap_or(body),
            })
        }
        Err(_) => Ok(ResponseOutcome::Failure {
            status: Some(status),
            message: format!("{body} May be invalid request."),
        }),
    }
}
