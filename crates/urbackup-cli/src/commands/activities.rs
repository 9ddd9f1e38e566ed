use crate::cli::{OutputFormat, StopProcessArgs};
use crate::client::{AppContext, CliResult};
use crate::output::render_activities;

pub(crate) async fn handle_activities(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let response = ctx.console.progress().await?;
    render_activities(
        &response.progress,
        response.lastacts.as_deref().unwrap_or_default(),
        format,
    )
}

pub(crate) async fn handle_stop_process(ctx: &AppContext, args: StopProcessArgs) -> CliResult<()> {
    ctx.console.stop_process(args.clientid, args.id).await?;
    println!(
        "Stop requested for process {} on client {}",
        args.id, args.clientid
    );
    Ok(())
}
