use std::path::PathBuf;

use urbackup_api_models::{ClientId, OsType, UsageGraphScale};
use urbackup_client::table::{filter_usage, sort_usage};

use crate::cli::{DownloadClientArgs, OutputFormat, UsageArgs, UsageGraphArgs, sort_direction};
use crate::client::{AppContext, CliResult};
use crate::commands::download_to_file;
use crate::output::{render_piegraph, render_usage, render_usagegraph, render_users};

pub(crate) async fn handle_usage(
    ctx: &AppContext,
    args: UsageArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.recalculate {
        ctx.console.recalculate_usage().await?;
    }

    let response = ctx.console.usage().await?;
    let query = args.search.as_deref().unwrap_or_default();
    let mut rows = filter_usage(&response.usage, query);
    if let Some(column) = args.sort {
        sort_usage(&mut rows, column.into(), sort_direction(args.desc));
    }
    render_usage(&rows, format)
}

pub(crate) async fn handle_piegraph(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let response = ctx.console.piegraph().await?;
    render_piegraph(&response, format)
}

pub(crate) async fn handle_usagegraph(
    ctx: &AppContext,
    args: UsageGraphArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let scale = UsageGraphScale::from(args.scale);
    let response = ctx.console.usagegraph(scale, args.clientid).await?;
    render_usagegraph(&response, scale, format)
}

pub(crate) async fn handle_users(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let response = ctx.console.users().await?;
    render_users(&response, format)
}

pub(crate) async fn handle_download_client(
    ctx: &AppContext,
    args: DownloadClientArgs,
) -> CliResult<()> {
    let os = OsType::from(args.os);
    let url = ctx
        .server()
        .download_client_url(args.clientid, args.authkey.as_deref(), os);
    if args.print_url {
        println!("{url}");
        return Ok(());
    }

    let dest = args
        .dest
        .unwrap_or_else(|| installer_file_name(args.clientid, os));
    download_to_file(ctx, url, &dest).await
}

fn installer_file_name(clientid: ClientId, os: OsType) -> PathBuf {
    let extension = match os {
        OsType::Windows => "exe",
        OsType::Linux => "sh",
        OsType::Mac => "pkg",
    };
    PathBuf::from(format!("urbackup-client-{clientid}.{extension}"))
}
