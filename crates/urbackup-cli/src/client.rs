//! Shared context, error types, and argument parsers for the CLI.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use url::Url;
use urbackup_client::config::{default_session_path, parse_server_url};
use urbackup_client::{ApiError, ClientConfig, Console, SessionStore, UrBackupServer};
use urbackup_telemetry::LogFormat;

use crate::cli::Cli;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    Unauthenticated,
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Unauthenticated => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::Unauthenticated => {
                "session expired or missing; run `urbackup-admin login` again".to_string()
            }
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::SessionNotFound => Self::Unauthenticated,
            ApiError::UsernameNotFound
            | ApiError::PasswordWrong
            | ApiError::UsernameOrPasswordWrong => Self::Validation(err.to_string()),
            other => Self::Failure(anyhow!(other.detail())),
        }
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) console: Console,
    pub(crate) sessions: SessionStore,
}

impl AppContext {
    /// Build the server handle from global flags and the persisted session.
    pub(crate) fn from_cli(cli: &Cli) -> CliResult<Self> {
        let session_path = cli
            .session_file
            .clone()
            .unwrap_or_else(default_session_path);
        let config = ClientConfig {
            server_url: cli.server_url.clone(),
            timeout: Duration::from_secs(cli.timeout),
            session_path,
        };
        let sessions = SessionStore::new(&config.session_path);
        let session = sessions.load()?;
        let server = UrBackupServer::new(&config, session)?;
        Ok(Self {
            console: Console::new(server),
            sessions,
        })
    }

    pub(crate) fn server(&self) -> &UrBackupServer {
        self.console.server()
    }

    /// Write the server's current session token to the session file.
    pub(crate) fn persist_session(&self) -> CliResult<()> {
        self.sessions.save(&self.server().session())?;
        Ok(())
    }
}

/// Parse the server URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    parse_server_url(input).map_err(|err| format!("invalid URL '{input}': {}", err.detail()))
}

/// Parse the log format provided to the CLI.
pub(crate) fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse::<LogFormat>().map_err(|err| err.to_string())
}

/// Reject empty or negative client id lists before calling the server.
pub(crate) fn require_ids(ids: &[i64]) -> CliResult<()> {
    if ids.is_empty() {
        return Err(CliError::validation("at least one client id is required"));
    }
    if let Some(bad) = ids.iter().find(|id| **id < 0) {
        return Err(CliError::validation(format!("invalid client id {bad}")));
    }
    Ok(())
}
