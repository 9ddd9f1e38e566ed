//! Output renderers and formatting helpers for CLI commands.
//!
//! Table renderers build the whole text first so tests can inspect it.

use std::fmt::Write as _;

use anyhow::anyhow;
use serde::Serialize;
use urbackup_api_models::{
    ActivityItem, BackupFilesResponse, BackupsClientsResponse, ClientBackupsResponse,
    PieGraphResponse, ProcessItem, StartBackupResponse, StatusClientItem, UsageClientStat,
    UsageGraphResponse, UsageGraphScale, UsersResponse,
};
use urbackup_client::format::{
    format_duration, format_eta, format_last_backup, format_local_datetime, format_progress,
    format_size, format_size_bits, graph_year,
};
use urbackup_client::table::PageSlice;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

/// Usage history samples are reported in megabytes.
const MIB: f64 = 1024.0 * 1024.0;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn emit<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    table: impl FnOnce() -> String,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            print!("{}", table());
            Ok(())
        }
    }
}

pub(crate) fn render_status_page(
    page: &PageSlice<'_, &StatusClientItem>,
    format: OutputFormat,
) -> CliResult<()> {
    emit(page.items, format, || status_table(page))
}

pub(crate) fn status_table(page: &PageSlice<'_, &StatusClientItem>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} {:<24} {:<16} {:<16} {:<7} STATUS",
        "ID", "NAME", "LAST FILE", "LAST IMAGE", "ONLINE"
    );
    for item in page.items {
        let _ = writeln!(
            out,
            "{:>5} {:<24} {:<16} {:<16} {:<7} {}",
            item.id,
            item.name,
            format_last_backup(item.lastbackup),
            format_last_backup(item.lastbackup_image),
            yes_no(item.online),
            client_status_text(item)
        );
    }
    let _ = writeln!(
        out,
        "page {} of {} ({} clients)",
        page.page, page.page_count, page.total
    );
    out
}

/// Running backups take the place of the status label while they run.
#[must_use]
pub(crate) fn client_status_text(item: &StatusClientItem) -> String {
    let running: Vec<String> = item
        .file_backup_processes()
        .chain(item.image_backup_processes())
        .map(|process| {
            format!(
                "{} ({})",
                process.action.label(),
                format_progress(process.pcdone)
            )
        })
        .collect();
    if running.is_empty() {
        item.status_code().label().to_string()
    } else {
        running.join(", ")
    }
}

pub(crate) fn render_start_results(
    response: &StartBackupResponse,
    format: OutputFormat,
) -> CliResult<()> {
    emit(response, format, || {
        let mut out = String::new();
        for result in &response.result {
            let outcome = if result.start_ok {
                "queued"
            } else {
                "could not be started"
            };
            let _ = writeln!(
                out,
                "client {}: {} {outcome}",
                result.clientid,
                result.start_type.as_str().replace('_', " ")
            );
        }
        out
    })
}

#[derive(Serialize)]
struct ActivitiesView<'a> {
    progress: &'a [ProcessItem],
    lastacts: &'a [ActivityItem],
}

pub(crate) fn render_activities(
    progress: &[ProcessItem],
    lastacts: &[ActivityItem],
    format: OutputFormat,
) -> CliResult<()> {
    let view = ActivitiesView { progress, lastacts };
    emit(&view, format, || activities_table(progress, lastacts))
}

pub(crate) fn activities_table(progress: &[ProcessItem], lastacts: &[ActivityItem]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Activities");
    if progress.is_empty() {
        let _ = writeln!(out, "  none running");
    } else {
        let _ = writeln!(
            out,
            "{:>5} {:<20} {:<26} {:>9} {:>12} {:>14} DETAILS",
            "ID", "CLIENT", "ACTION", "PROGRESS", "ETA", "SPEED"
        );
        for process in progress {
            let _ = writeln!(
                out,
                "{:>5} {:<20} {:<26} {:>9} {:>12} {:>14} {}",
                process.id,
                process.name,
                process.action.label(),
                format_progress(process.pcdone),
                format_eta(process.eta_ms),
                format_speed(process.speed_bpms),
                process.details
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Last activities");
    let _ = writeln!(
        out,
        "{:<20} {:<30} {:>12} {:>12} {:<16} DETAILS",
        "CLIENT", "ACTION", "SIZE", "DURATION", "TIME"
    );
    for activity in lastacts {
        let _ = writeln!(
            out,
            "{:<20} {:<30} {:>12} {:>12} {:<16} {}",
            activity.name,
            activity.action().label(),
            signed_size(activity.size_bytes),
            format_duration(activity.duration),
            format_local_datetime(activity.backuptime),
            activity.details
        );
    }
    out
}

pub(crate) fn render_backup_clients(
    response: &BackupsClientsResponse,
    format: OutputFormat,
) -> CliResult<()> {
    emit(response, format, || {
        let mut out = String::new();
        let _ = writeln!(out, "{:>5} {:<24} LAST BACKUP", "ID", "NAME");
        for client in &response.clients {
            let _ = writeln!(
                out,
                "{:>5} {:<24} {}",
                client.id,
                client.name,
                format_last_backup(client.lastbackup)
            );
        }
        out
    })
}

pub(crate) fn render_client_backups(
    response: &ClientBackupsResponse,
    format: OutputFormat,
) -> CliResult<()> {
    emit(response, format, || client_backups_table(response))
}

pub(crate) fn client_backups_table(response: &ClientBackupsResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Backups > {}", response.clientname);
    let _ = writeln!(
        out,
        "{:>6} {:<16} {:<12} {:>12} {:<9} STATE",
        "ID", "TIME", "KIND", "SIZE", "ARCHIVED"
    );
    for backup in &response.backups {
        let kind = if backup.incremental > 0 {
            "incremental"
        } else {
            "full"
        };
        let state = if backup.delete_pending {
            "deleting"
        } else if backup.disable_delete {
            "locked"
        } else {
            "-"
        };
        let _ = writeln!(
            out,
            "{:>6} {:<16} {:<12} {:>12} {:<9} {state}",
            backup.id,
            format_local_datetime(backup.backuptime),
            kind,
            format_size(bytes(backup.size_bytes)),
            yes_no(backup.is_archived())
        );
    }
    out
}

pub(crate) fn render_backup_files(
    response: &BackupFilesResponse,
    crumbs: &[String],
    format: OutputFormat,
) -> CliResult<()> {
    emit(response, format, || backup_files_table(response, crumbs))
}

pub(crate) fn backup_files_table(response: &BackupFilesResponse, crumbs: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", crumbs.join(" > "));
    let _ = writeln!(out, "{:<4} {:>12} {:<16} NAME", "TYPE", "SIZE", "MODIFIED");
    for file in &response.files {
        let (kind, size) = if file.dir {
            ("dir", "-".to_string())
        } else {
            ("file", format_size(bytes(file.size)))
        };
        let _ = writeln!(
            out,
            "{kind:<4} {size:>12} {:<16} {}",
            format_local_datetime(file.r#mod),
            file.name
        );
    }
    out
}

pub(crate) fn render_usage(rows: &[&UsageClientStat], format: OutputFormat) -> CliResult<()> {
    emit(rows, format, || usage_table(rows))
}

pub(crate) fn usage_table(rows: &[&UsageClientStat]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>12} {:>12} {:>12}",
        "NAME", "FILES", "IMAGES", "USED"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<24} {:>12} {:>12} {:>12}",
            row.name,
            format_size(row.files),
            format_size(row.images),
            format_size(row.used)
        );
    }
    out
}

pub(crate) fn render_piegraph(response: &PieGraphResponse, format: OutputFormat) -> CliResult<()> {
    emit(response, format, || {
        let mut out = String::new();
        let _ = writeln!(out, "{:<24} {:>12}", "CLIENT", "USED");
        for slice in &response.data {
            let _ = writeln!(out, "{:<24} {:>12}", slice.label, format_size(slice.data));
        }
        out
    })
}

pub(crate) fn render_usagegraph(
    response: &UsageGraphResponse,
    scale: UsageGraphScale,
    format: OutputFormat,
) -> CliResult<()> {
    emit(response, format, || usagegraph_table(response, scale))
}

pub(crate) fn usagegraph_table(response: &UsageGraphResponse, scale: UsageGraphScale) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<12} {:>12}", "DATE", "USED");
    for point in &response.data {
        let label = if scale == UsageGraphScale::Year {
            graph_year(&point.xlabel)
        } else {
            point.xlabel.clone()
        };
        let _ = writeln!(
            out,
            "{label:<12} {:>12}",
            format_size(point.data * MIB)
        );
    }
    out
}

pub(crate) fn render_users(response: &UsersResponse, format: OutputFormat) -> CliResult<()> {
    emit(response, format, || {
        let mut out = String::new();
        let _ = writeln!(out, "{:>5} NAME", "ID");
        for user in &response.users {
            let _ = writeln!(out, "{:>5} {}", user.id, user.name);
        }
        out
    })
}

#[must_use]
pub(crate) const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Freed space is reported as a negative size.
#[must_use]
pub(crate) fn signed_size(size_bytes: i64) -> String {
    let text = format_size(bytes(size_bytes.saturating_abs()));
    if size_bytes < 0 {
        format!("-{text}")
    } else {
        text
    }
}

/// Server speeds are bytes per millisecond.
#[must_use]
pub(crate) fn format_speed(bytes_per_ms: f64) -> String {
    if bytes_per_ms <= 0.0 {
        return "-".to_string();
    }
    format!("{}/s", format_size_bits(bytes_per_ms * 8.0 * 1000.0))
}

#[allow(clippy::cast_precision_loss)]
fn bytes(value: i64) -> f64 {
    value as f64
}
