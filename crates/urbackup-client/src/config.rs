//! Connection settings shared by the library and the CLI.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{ApiError, ApiResult};

/// Default address of a locally installed server's web interface.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:55414/";

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const APP_DIR: &str = "urbackup-admin";
const SESSION_FILE: &str = "session";

/// Settings needed to talk to one server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the web interface.
    pub server_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// File the session token is persisted to.
    pub session_path: PathBuf,
}

impl ClientConfig {
    /// Build a configuration for `server_url` with default timeout and session path.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the URL cannot be parsed.
    pub fn new(server_url: &str) -> ApiResult<Self> {
        Ok(Self {
            server_url: parse_server_url(server_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_path: default_session_path(),
        })
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the session file.
    #[must_use]
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }
}

/// Parse a server URL, forcing a trailing slash so relative joins stay inside it.
///
/// # Errors
///
/// Returns [`ApiError::InvalidUrl`] when the input is not an absolute URL.
pub fn parse_server_url(input: &str) -> ApiResult<Url> {
    let trimmed = input.trim();
    let normalised = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&normalised).map_err(|source| ApiError::InvalidUrl { source })
}

/// `<config dir>/urbackup-admin/session`, falling back to the working directory.
#[must_use]
pub fn default_session_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(SESSION_FILE)
}
