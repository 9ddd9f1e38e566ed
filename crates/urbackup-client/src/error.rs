//! Error types for UrBackup server interactions.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for server operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Primary error type for server operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server no longer knows the session; the caller must log in again.
    #[error("session not found")]
    SessionNotFound,
    /// The salt lookup did not find the user.
    #[error("username not found")]
    UsernameNotFound,
    /// The salt lookup rejected the password.
    #[error("password wrong")]
    PasswordWrong,
    /// The login step rejected the credentials.
    #[error("username or password wrong")]
    UsernameOrPasswordWrong,
    /// The session may not browse backups.
    #[error("backup access denied")]
    BackupsAccessDenied,
    /// The backups action reported an error.
    #[error("backup access failed")]
    BackupsAccess {
        /// Error string reported by the server.
        message: String,
    },
    /// The response body did not match the expected payload.
    #[error("failed to decode server response")]
    ResponseParse {
        /// Action whose response failed to decode.
        action: &'static str,
        /// Decoder detail.
        detail: String,
    },
    /// The HTTP request could not be completed.
    #[error("request to server failed")]
    Transport {
        /// Action being requested.
        action: &'static str,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("server returned an error status")]
    HttpStatus {
        /// Action being requested.
        action: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// A server or download URL could not be built.
    #[error("invalid server URL")]
    InvalidUrl {
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// Reading or writing the persisted session failed.
    #[error("session store operation failed")]
    SessionStore {
        /// Operation that failed.
        operation: &'static str,
        /// Session file involved.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Streaming a download to its destination failed.
    #[error("download failed")]
    Download {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ApiError {
    /// True for failures worth one automatic retry (transport errors and 5xx).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// True when the caller has to authenticate again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::SessionNotFound)
    }

    /// Human readable detail including the fields the constant message omits.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::BackupsAccess { message } => format!("{self}: {message}"),
            Self::ResponseParse { action, detail } => format!("{self} ({action}): {detail}"),
            Self::Transport { action, source } => format!("{self} ({action}): {source}"),
            Self::HttpStatus { action, status } => format!("{self} ({action}): {status}"),
            Self::InvalidUrl { source } => format!("{self}: {source}"),
            Self::SessionStore {
                operation,
                path,
                source,
            } => format!("{self} ({operation} {}): {source}", path.display()),
            Self::Download { operation, source } => format!("{self} ({operation}): {source}"),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn only_server_side_failures_are_retryable() {
        assert!(
            ApiError::HttpStatus {
                action: "status",
                status: 503
            }
            .is_retryable()
        );
        assert!(
            !ApiError::HttpStatus {
                action: "status",
                status: 404
            }
            .is_retryable()
        );
        assert!(!ApiError::SessionNotFound.is_retryable());
        assert!(!ApiError::PasswordWrong.is_retryable());
    }

    #[test]
    fn session_not_found_requires_login() {
        assert!(ApiError::SessionNotFound.requires_login());
        assert!(!ApiError::BackupsAccessDenied.requires_login());
    }

    #[test]
    fn messages_are_constant_and_sources_preserved() {
        let err = ApiError::SessionStore {
            operation: "read",
            path: PathBuf::from("/tmp/session"),
            source: io::Error::other("boom"),
        };
        assert_eq!(err.to_string(), "session store operation failed");
        assert!(err.source().is_some());
        assert!(err.detail().contains("/tmp/session"));

        let access = ApiError::BackupsAccess {
            message: "client_not_found".to_string(),
        };
        assert_eq!(access.detail(), "backup access failed: client_not_found");
    }
}
