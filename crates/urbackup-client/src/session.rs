//! File-backed persistence of the session token between invocations.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Stores one session token in a file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token; an absent file yields an empty token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionStore`] when the file exists but cannot be read.
    pub fn load(&self) -> ApiResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents.trim().to_string()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(self.error("read", source)),
        }
    }

    /// Persist `session`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionStore`] when the directory or file cannot be written.
    pub fn save(&self, session: &str) -> ApiResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.error("create_dir", source))?;
        }
        let mut file = private_file_options()
            .open(&self.path)
            .map_err(|source| self.error("open", source))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|source| self.error("chmod", source))?;
        }
        file.write_all(session.as_bytes())
            .map_err(|source| self.error("write", source))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Forget the stored session. Clearing an absent file succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::SessionStore`] when the file cannot be removed.
    pub fn clear(&self) -> ApiResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.error("remove", source)),
        }
    }

    fn error(&self, operation: &'static str, source: std::io::Error) -> ApiError {
        ApiError::SessionStore {
            operation,
            path: self.path.clone(),
            source,
        }
    }
}

/// Owner-only permissions; `mode` applies when the file is created.
#[cfg(unix)]
fn private_file_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true).mode(0o600);
    options
}

#[cfg(not(unix))]
fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    options
}
