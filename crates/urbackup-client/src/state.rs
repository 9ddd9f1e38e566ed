//! Navigation state of the console: which page is active and whether the
//! operator still has to log in.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::UrBackupServer;
use crate::error::ApiError;

/// Top-level views of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Client status overview.
    #[default]
    Status,
    /// Running and recent activities.
    Activities,
    /// Backup browser.
    Backups,
    /// Storage statistics.
    Statistics,
    /// Login form.
    Login,
}

impl Page {
    /// Lowercase page name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Activities => "activities",
            Self::Backups => "backups",
            Self::Statistics => "statistics",
            Self::Login => "login",
        }
    }
}

/// Session-wide navigation flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    /// Whether the held session is known to be authenticated.
    pub logged_in: bool,
    /// Whether the startup probe has completed.
    pub startup_complete: bool,
    /// Page currently shown.
    pub active_page: Page,
    /// Page to return to once login succeeds.
    pub page_after_login: Page,
}

impl AppState {
    /// Navigate to `page`, probing the session first when not logged in.
    ///
    /// Returns the page that ends up active: `page` itself, or
    /// [`Page::Login`] when the server no longer knows the session. Probe
    /// failures other than a missing session leave the operator on `page`.
    pub async fn enter(&mut self, page: Page, server: &UrBackupServer) -> Page {
        self.page_after_login = page;
        if !self.logged_in {
            match server.status().await {
                Err(ApiError::SessionNotFound) => {
                    debug!(page = page.as_str(), "session expired; redirecting to login");
                    self.active_page = Page::Login;
                    self.startup_complete = true;
                    return Page::Login;
                }
                _ => self.logged_in = true,
            }
        }
        self.startup_complete = true;
        self.active_page = page;
        page
    }

    /// Record a successful login and return the page to continue on.
    pub const fn complete_login(&mut self) -> Page {
        self.logged_in = true;
        self.startup_complete = true;
        self.active_page = self.page_after_login;
        self.page_after_login
    }

    /// Forget the authenticated state and show the login form.
    pub const fn logout(&mut self) {
        self.logged_in = false;
        self.active_page = Page::Login;
    }
}
