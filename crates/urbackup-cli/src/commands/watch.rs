//! Polling views that redraw until interrupted.

use std::io::{self, IsTerminal};
use std::time::Duration;

use tracing::{debug, warn};
use urbackup_client::table::{paginate, visible_clients};
use urbackup_client::{AppState, Page, QueryOptions, QueryWatch};

use crate::cli::{OutputFormat, WatchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_activities, render_status_page};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

pub(crate) async fn handle_watch_status(
    ctx: &AppContext,
    args: WatchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let options = poll_options(&args)?;
    let mut state = AppState::default();
    enter(&mut state, Page::Status, ctx).await?;

    let mut watch = ctx.console.watch_status(options);
    run_watch(&mut watch, &args, &mut state, format, |response| {
        let rows = visible_clients(&response.status);
        let page = paginate(&rows, 1, rows.len());
        render_status_page(&page, format)
    })
    .await
}

pub(crate) async fn handle_watch_activities(
    ctx: &AppContext,
    args: WatchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let options = poll_options(&args)?;
    let mut state = AppState::default();
    enter(&mut state, Page::Activities, ctx).await?;

    let mut watch = ctx.console.watch_progress(options);
    run_watch(&mut watch, &args, &mut state, format, |response| {
        render_activities(
            &response.progress,
            response.lastacts.as_deref().unwrap_or_default(),
            format,
        )
    })
    .await
}

fn poll_options(args: &WatchArgs) -> CliResult<QueryOptions> {
    if args.interval_ms == 0 {
        return Err(CliError::validation("--interval-ms must be positive"));
    }
    if args.count == Some(0) {
        return Err(CliError::validation("--count must be positive"));
    }
    Ok(QueryOptions::polling(Duration::from_millis(args.interval_ms)))
}

async fn enter(state: &mut AppState, page: Page, ctx: &AppContext) -> CliResult<()> {
    if state.enter(page, ctx.server()).await == Page::Login {
        return Err(CliError::Unauthenticated);
    }
    Ok(())
}

async fn run_watch<T, R>(
    watch: &mut QueryWatch<T>,
    args: &WatchArgs,
    state: &mut AppState,
    format: OutputFormat,
    mut render: R,
) -> CliResult<()>
where
    T: Clone,
    R: FnMut(&T) -> CliResult<()>,
{
    let redraw = format == OutputFormat::Table && io::stdout().is_terminal();
    let mut refreshes = 0_u64;

    loop {
        let update = tokio::select! {
            update = watch.changed() => update,
            signal = tokio::signal::ctrl_c() => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for interrupt");
                }
                debug!(refreshes, "watch interrupted");
                return Ok(());
            }
        };
        let Some(update) = update else {
            return Ok(());
        };

        if update.requires_login {
            state.logout();
            return Err(CliError::Unauthenticated);
        }
        if let Some(error) = &update.error {
            eprintln!("refresh failed: {error}");
        } else if let Some(data) = &update.data {
            if redraw {
                print!("{CLEAR_SCREEN}");
            }
            render(data)?;
        }

        refreshes += 1;
        if args.count.is_some_and(|limit| refreshes >= limit) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context_with;
    use httpmock::prelude::*;
    use serde_json::json;

    fn args(count: u64) -> WatchArgs {
        WatchArgs {
            interval_ms: 10,
            count: Some(count),
        }
    }

    #[tokio::test]
    async fn watch_status_polls_until_count() {
        let server = MockServer::start_async().await;
        let status = server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "status");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": [{"id": 1, "name": "alpha"}]}));
        });

        let (ctx, _dir) = context_with(&server, "abc");
        handle_watch_status(&ctx, args(3), OutputFormat::Json)
            .await
            .expect("watch should finish");

        assert!(status.calls() >= 4);
    }

    #[tokio::test]
    async fn watch_redirects_to_login_when_session_expired() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "status");
            then.status(200).json_body(json!({"error": 1}));
        });

        let (ctx, _dir) = context_with(&server, "old");
        let err = handle_watch_activities(&ctx, args(1), OutputFormat::Table)
            .await
            .expect_err("login required");
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn watch_activities_renders_progress() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/x").query_param("a", "status");
            then.status(200).json_body(json!({"status": []}));
        });
        let progress = server.mock(|when, then| {
            when.method(POST)
                .path("/x")
                .query_param("a", "progress")
                .form_urlencoded_tuple("with_lastacts", "1");
            then.status(200).json_body(json!({"progress": [], "lastacts": []}));
        });

        let (ctx, _dir) = context_with(&server, "abc");
        handle_watch_activities(&ctx, args(2), OutputFormat::Json)
            .await
            .expect("watch should finish");
        assert!(progress.calls() >= 2);
    }

    #[test]
    fn poll_options_reject_zero_values() {
        let zero_interval = WatchArgs {
            interval_ms: 0,
            count: None,
        };
        assert!(poll_options(&zero_interval).is_err());
        assert!(poll_options(&args(0)).is_err());
        let options = poll_options(&args(1)).expect("valid options");
        assert_eq!(options.refetch_interval, Some(Duration::from_millis(10)));
    }
}
