#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Client library for administering an UrBackup server.
//!
//! Layout:
//! - `api.rs`: typed calls against the server's JSON actions
//! - `auth.rs`: challenge-response password hashing
//! - `config.rs`: server URL, timeout and session path settings
//! - `console.rs`: cached queries plus invalidating mutations
//! - `error.rs`: error taxonomy shared by every call
//! - `format.rs` / `table.rs`: display helpers for the views
//! - `query.rs`: keyed cache, request coalescing and pollers
//! - `session.rs` / `state.rs`: session persistence and navigation state

pub mod api;
pub mod auth;
pub mod config;
pub mod console;
pub mod error;
pub mod format;
pub mod query;
pub mod session;
pub mod state;
pub mod table;

pub use api::UrBackupServer;
pub use config::ClientConfig;
pub use console::Console;
pub use error::{ApiError, ApiResult};
pub use query::{POLL_INTERVAL, QueryClient, QueryKey, QueryOptions, QueryState, QueryWatch};
pub use session::SessionStore;
pub use state::{AppState, Page};
