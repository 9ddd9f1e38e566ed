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

//! Logging primitives shared by the UrBackup admin tools.
//!
//! Centralises subscriber setup so the CLI and library code emit the same
//! structured fields regardless of which surface triggered the work.

pub mod context;
pub mod error;
pub mod init;

pub use context::{command_span, record_outcome};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
