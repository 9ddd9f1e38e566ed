//! Span helpers that tag work with the command being executed.

use tracing::Span;

use crate::init::build_sha;

/// Root span for one CLI command; `outcome` is filled in by [`record_outcome`].
#[must_use]
pub fn command_span(command: &str) -> Span {
    tracing::info_span!(
        "command",
        command = %command,
        build_sha = %build_sha(),
        outcome = tracing::field::Empty,
        exit_code = tracing::field::Empty
    )
}

/// Record how a command finished on its root span.
pub fn record_outcome(span: &Span, outcome: &str, exit_code: i32) {
    span.record("outcome", tracing::field::display(outcome));
    span.record("exit_code", exit_code);
}
