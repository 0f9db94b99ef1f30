//! Settings, credential provider, and the endpoint/credential setters.
//!
//! Settings live in a JSON file; `REZSYNC_ENDPOINT` and
//! `REZSYNC_AUTHORIZATION` override the file when set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SyncError};

pub const ENV_ENDPOINT: &str = "REZSYNC_ENDPOINT";
pub const ENV_AUTHORIZATION: &str = "REZSYNC_AUTHORIZATION";

const SHORT_NAME_PATTERN: &str = r"^[A-Za-z0-9_]{2,16}$";
const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_]{1,100}$";
const TOKEN_PATTERN: &str =
    r"^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$";

/// Supplies what every backend call needs. Either value may be absent,
/// which callers treat as a configuration error.
pub trait CredentialProvider {
    /// Full `Authorization` header value (`Basic <base64(user:token)>`).
    fn authorization(&self) -> Option<String>;
    /// Base URL that `/services/...` paths are appended to.
    fn endpoint_base(&self) -> Option<String>;
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for &T {
    fn authorization(&self) -> Option<String> {
        (**self).authorization()
    }

    fn endpoint_base(&self) -> Option<String> {
        (**self).endpoint_base()
    }
}

/// Fixed credentials, mostly for tests and one-off CLI runs.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    pub authorization: Option<String>,
    pub endpoint: Option<String>,
}

impl CredentialProvider for StaticCredentials {
    fn authorization(&self) -> Option<String> {
        self.authorization.clone()
    }

    fn endpoint_base(&self) -> Option<String> {
        self.endpoint.clone()
    }
}

fn default_timeout_secs() -> u64 {
    60
}

/// Persisted configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Encoded `Basic …` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Directory holding `<spreadsheetId>.xlsx` workbooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workbook_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: None,
            credentials: None,
            notify_email: None,
            timeout_secs: default_timeout_secs(),
            workbook_dir: None,
        }
    }
}

impl Settings {
    /// Load from `path` (a missing file yields defaults), then apply
    /// environment overrides.
    ///
    /// # Errors
    /// I/O errors other than not-found, or malformed JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        settings.apply_overrides(&std::env::vars().collect());
        Ok(settings)
    }

    /// Apply `REZSYNC_*` overrides from a key/value map. Blank values are
    /// ignored.
    pub fn apply_overrides(&mut self, kv: &HashMap<String, String>) {
        if let Some(endpoint) = nonempty(kv.get(ENV_ENDPOINT)) {
            self.endpoint = Some(endpoint);
        }
        if let Some(authorization) = nonempty(kv.get(ENV_AUTHORIZATION)) {
            self.credentials = Some(authorization);
        }
    }

    /// # Errors
    /// Serialization or I/O failures.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Store the endpoint for a customer short name.
    ///
    /// # Errors
    /// [`SyncError::Validation`] for an invalid short name.
    pub fn configure_endpoint(&mut self, short_name: &str) -> Result<()> {
        self.endpoint = Some(endpoint_for(short_name)?);
        info!("Customer shortname updated");
        Ok(())
    }

    /// Validate and store encoded credentials.
    ///
    /// # Errors
    /// [`SyncError::Validation`] for a bad username or token.
    pub fn configure_credentials(&mut self, username: &str, token: &str) -> Result<()> {
        self.credentials = Some(encode_credentials(username, token)?);
        info!("Credentials updated");
        Ok(())
    }
}

impl CredentialProvider for Settings {
    fn authorization(&self) -> Option<String> {
        self.credentials.clone()
    }

    fn endpoint_base(&self) -> Option<String> {
        self.endpoint.clone()
    }
}

fn nonempty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// REST endpoint for a customer short name (2-16 word characters).
///
/// # Errors
/// [`SyncError::Validation`] for an invalid short name.
pub fn endpoint_for(short_name: &str) -> Result<String> {
    if !Regex::new(SHORT_NAME_PATTERN)?.is_match(short_name) {
        return Err(SyncError::validation("Invalid Customer Shortname"));
    }
    Ok(format!(
        "https://{short_name}.starrezhousing.com/StarRezRest"
    ))
}

/// `Basic base64(username:token)` after validating both parts.
///
/// # Errors
/// [`SyncError::Validation`] for a bad username or token.
pub fn encode_credentials(username: &str, token: &str) -> Result<String> {
    let username_ok = Regex::new(USERNAME_PATTERN)?.is_match(username);
    let token_ok = Regex::new(TOKEN_PATTERN)?.is_match(token);
    if !username_ok || !token_ok {
        return Err(SyncError::validation(
            "Invalid username or web services token.",
        ));
    }
    Ok(format!(
        "Basic {}",
        STANDARD.encode(format!("{username}:{token}"))
    ))
}
