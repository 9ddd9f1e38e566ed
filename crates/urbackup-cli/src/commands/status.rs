use anyhow::anyhow;
use urbackup_client::table::{filter_status, is_valid_page_size, paginate, sort_status};

use crate::cli::{OutputFormat, RemoveClientArgs, StartBackupArgs, StatusArgs, sort_direction};
use crate::client::{AppContext, CliError, CliResult, require_ids};
use crate::output::{render_start_results, render_status_page};

pub(crate) async fn handle_status(
    ctx: &AppContext,
    args: StatusArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if !is_valid_page_size(args.per_page) {
        return Err(CliError::validation(
            "--per-page must be one of 10, 25, 50 or 100",
        ));
    }
    if args.page == 0 {
        return Err(CliError::validation("page numbers start at 1"));
    }

    let response = ctx.console.status().await?;
    let query = args.search.as_deref().unwrap_or_default();
    let mut rows = filter_status(&response.status, query, args.all);
    sort_status(&mut rows, args.sort.into(), sort_direction(args.desc));
    let page = paginate(&rows, args.page, args.per_page);
    render_status_page(&page, format)
}

pub(crate) async fn handle_start_backup(
    ctx: &AppContext,
    args: StartBackupArgs,
    format: OutputFormat,
) -> CliResult<()> {
    require_ids(&args.ids)?;
    let response = ctx
        .console
        .start_backup(&args.ids, args.backup_type.into())
        .await?;
    render_start_results(&response, format)?;

    if !response.result.is_empty() && response.result.iter().all(|item| !item.start_ok) {
        return Err(CliError::failure(anyhow!(
            "the server could not start any of the requested backups"
        )));
    }
    Ok(())
}

pub(crate) async fn handle_remove_client(
    ctx: &AppContext,
    args: RemoveClientArgs,
) -> CliResult<()> {
    require_ids(&args.ids)?;
    let count = args.ids.len();
    if args.stop {
        ctx.console.stop_remove_clients(&args.ids).await?;
        println!("Cancelled removal of {count} client(s)");
    } else {
        ctx.console.remove_clients(&args.ids).await?;
        println!("Scheduled removal of {count} client(s)");
    }
    Ok(())
}
