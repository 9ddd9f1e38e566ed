//! Argument parsing, logging setup, and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{Instrument, debug};
use url::Url;
use urbackup_api_models::{BackupId, BackupType, ClientId, OsType, UsageGraphScale};
use urbackup_client::config::{DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS};
use urbackup_client::table::{DEFAULT_PAGE_SIZE, SortDirection, StatusColumn, UsageColumn};
use urbackup_telemetry::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, command_span, init_logging, record_outcome,
};
use uuid::Uuid;

use crate::client::{AppContext, CliResult, parse_log_format, parse_url};
use crate::commands::activities::{handle_activities, handle_stop_process};
use crate::commands::auth::{handle_login, handle_logout};
use crate::commands::backups::{
    BackupVerb, handle_backup_clients, handle_backup_download, handle_backup_files,
    handle_backup_list, handle_backup_mount, handle_backup_verb, handle_zip_download,
};
use crate::commands::statistics::{
    handle_download_client, handle_piegraph, handle_usage, handle_usagegraph, handle_users,
};
use crate::commands::status::{handle_remove_client, handle_start_backup, handle_status};
use crate::commands::watch::{handle_watch_activities, handle_watch_status};

/// Parses CLI arguments, executes the requested command, and records the
/// outcome on the command span. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(&cli);

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4();
    let span = command_span(command_name);
    debug!(parent: &span, %trace_id, server = %cli.server_url, "dispatching command");

    let result = dispatch(cli).instrument(span.clone()).await;

    let (exit_code, outcome) = match result {
        Ok(()) => (0, "success"),
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            (err.exit_code(), "error")
        }
    };
    record_outcome(&span, outcome, exit_code);
    exit_code
}

fn init_tracing(cli: &Cli) {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("URBACKUP_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: logging disabled: {err}");
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = AppContext::from_cli(&cli)?;
    let format = cli.output;

    match cli.command {
        Command::Login(args) => handle_login(&ctx, args).await,
        Command::Logout => handle_logout(&ctx),
        Command::Status(args) => handle_status(&ctx, args, format).await,
        Command::StartBackup(args) => handle_start_backup(&ctx, args, format).await,
        Command::RemoveClient(args) => handle_remove_client(&ctx, args).await,
        Command::Activities => handle_activities(&ctx, format).await,
        Command::StopProcess(args) => handle_stop_process(&ctx, args).await,
        Command::Watch(watch) => match watch {
            WatchCommand::Status(args) => handle_watch_status(&ctx, args, format).await,
            WatchCommand::Activities(args) => handle_watch_activities(&ctx, args, format).await,
        },
        Command::Backups(backups) => match backups {
            BackupsCommand::Clients => handle_backup_clients(&ctx, format).await,
            BackupsCommand::List(args) => handle_backup_list(&ctx, args, format).await,
            BackupsCommand::Files(args) => handle_backup_files(&ctx, args, format).await,
            BackupsCommand::Archive(args) => {
                handle_backup_verb(&ctx, args, BackupVerb::Archive).await
            }
            BackupsCommand::Unarchive(args) => {
                handle_backup_verb(&ctx, args, BackupVerb::Unarchive).await
            }
            BackupsCommand::Delete(args) => handle_backup_verb(&ctx, args, BackupVerb::Delete).await,
            BackupsCommand::StopDelete(args) => {
                handle_backup_verb(&ctx, args, BackupVerb::StopDelete).await
            }
            BackupsCommand::DeleteNow(args) => {
                handle_backup_verb(&ctx, args, BackupVerb::DeleteNow).await
            }
            BackupsCommand::Mount(args) => handle_backup_mount(&ctx, args, format).await,
            BackupsCommand::Download(args) => handle_backup_download(&ctx, args).await,
            BackupsCommand::DownloadZip(args) => handle_zip_download(&ctx, args).await,
        },
        Command::DownloadClient(args) => handle_download_client(&ctx, args).await,
        Command::Usage(args) => handle_usage(&ctx, args, format).await,
        Command::Piegraph => handle_piegraph(&ctx, format).await,
        Command::Usagegraph(args) => handle_usagegraph(&ctx, args, format).await,
        Command::Users => handle_users(&ctx, format).await,
    }
}

#[derive(Parser)]
#[command(
    name = "urbackup-admin",
    version,
    about = "Administrative console for an UrBackup server"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "URBACKUP_SERVER_URL",
        value_parser = parse_url,
        default_value = DEFAULT_SERVER_URL
    )]
    pub(crate) server_url: Url,
    #[arg(
        long,
        global = true,
        env = "URBACKUP_SESSION_FILE",
        help = "File the session token is kept in between invocations"
    )]
    pub(crate) session_file: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "URBACKUP_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(long, global = true, env = "URBACKUP_LOG", default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "URBACKUP_LOG_FORMAT",
        value_parser = parse_log_format,
        help = "Log format: pretty or json (defaults by build profile)"
    )]
    pub(crate) log_format: Option<LogFormat>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Log in, trying anonymous access first.
    Login(LoginArgs),
    /// Forget the stored session.
    Logout,
    /// Show the client status overview.
    Status(StatusArgs),
    /// Start backups on one or more clients.
    StartBackup(StartBackupArgs),
    /// Schedule clients for removal, or cancel that with --stop.
    RemoveClient(RemoveClientArgs),
    /// Show running processes and recent activities.
    Activities,
    /// Stop a running process.
    StopProcess(StopProcessArgs),
    /// Keep a view on screen, refreshing it periodically.
    #[command(subcommand)]
    Watch(WatchCommand),
    /// Browse and manage stored backups.
    #[command(subcommand)]
    Backups(BackupsCommand),
    /// Download a preconfigured client installer.
    DownloadClient(DownloadClientArgs),
    /// Show storage used per client.
    Usage(UsageArgs),
    /// Show the storage allocation chart data.
    Piegraph,
    /// Show storage usage history.
    Usagegraph(UsageGraphArgs),
    /// List users visible to the session.
    Users,
}

#[derive(Args, Default)]
pub(crate) struct LoginArgs {
    #[arg(long, env = "URBACKUP_USERNAME")]
    pub(crate) username: Option<String>,
    #[arg(long, env = "URBACKUP_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
    #[arg(long, conflicts_with = "password", help = "Read the password from stdin")]
    pub(crate) password_stdin: bool,
    #[arg(long, help = "Authenticate against the directory (LDAP/AD)")]
    pub(crate) ldap: bool,
}

#[derive(Args)]
pub(crate) struct StatusArgs {
    #[arg(long, help = "Case-insensitive filter over the displayed columns")]
    pub(crate) search: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: usize,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, help = "Rows per page: 10, 25, 50 or 100")]
    pub(crate) per_page: usize,
    #[arg(long, value_enum, default_value_t = StatusSort::Name)]
    pub(crate) sort: StatusSort,
    #[arg(long, help = "Sort in descending order")]
    pub(crate) desc: bool,
    #[arg(long, help = "Include clients pending removal")]
    pub(crate) all: bool,
}

impl Default for StatusArgs {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
            sort: StatusSort::Name,
            desc: false,
            all: false,
        }
    }
}

#[derive(Args)]
pub(crate) struct StartBackupArgs {
    #[arg(value_enum)]
    pub(crate) backup_type: BackupTypeArg,
    #[arg(required = true, value_delimiter = ',', help = "Client identifiers")]
    pub(crate) ids: Vec<ClientId>,
}

#[derive(Args)]
pub(crate) struct RemoveClientArgs {
    #[arg(required = true, value_delimiter = ',', help = "Client identifiers")]
    pub(crate) ids: Vec<ClientId>,
    #[arg(long, help = "Cancel a scheduled removal instead")]
    pub(crate) stop: bool,
}

#[derive(Args)]
pub(crate) struct StopProcessArgs {
    pub(crate) clientid: ClientId,
    #[arg(help = "Process identifier as shown by `activities`")]
    pub(crate) id: i64,
}

#[derive(Subcommand)]
pub(crate) enum WatchCommand {
    Status(WatchArgs),
    Activities(WatchArgs),
}

#[derive(Args)]
pub(crate) struct WatchArgs {
    #[arg(long, default_value_t = 5000)]
    pub(crate) interval_ms: u64,
    #[arg(long, help = "Stop after this many refreshes")]
    pub(crate) count: Option<u64>,
}

#[derive(Subcommand)]
pub(crate) enum BackupsCommand {
    /// Clients that have backups.
    Clients,
    /// Backups stored for one client.
    List(ClientArgs),
    /// Browse a directory inside a backup.
    Files(FilesArgs),
    Archive(BackupRefArgs),
    Unarchive(BackupRefArgs),
    /// Queue a backup for deletion.
    Delete(BackupRefArgs),
    /// Cancel a queued deletion.
    StopDelete(BackupRefArgs),
    /// Delete a backup immediately.
    DeleteNow(BackupRefArgs),
    /// Mount an image backup and list its root.
    Mount(BackupRefArgs),
    /// Download one file from a backup.
    Download(FileDownloadArgs),
    /// Download a directory of a backup as ZIP.
    DownloadZip(ZipDownloadArgs),
}

#[derive(Args)]
pub(crate) struct ClientArgs {
    pub(crate) clientid: ClientId,
}

#[derive(Args)]
pub(crate) struct BackupRefArgs {
    pub(crate) clientid: ClientId,
    pub(crate) backupid: BackupId,
}

#[derive(Args)]
pub(crate) struct FilesArgs {
    pub(crate) clientid: ClientId,
    pub(crate) backupid: BackupId,
    #[arg(long, default_value = "/")]
    pub(crate) path: String,
}

#[derive(Args)]
pub(crate) struct FileDownloadArgs {
    pub(crate) clientid: ClientId,
    pub(crate) backupid: BackupId,
    #[arg(help = "Path of the file inside the backup")]
    pub(crate) path: String,
    #[arg(long, help = "Destination file (defaults to the file name)")]
    pub(crate) dest: Option<PathBuf>,
    #[arg(long, help = "Print the download link instead of downloading")]
    pub(crate) print_url: bool,
}

#[derive(Args)]
pub(crate) struct ZipDownloadArgs {
    pub(crate) clientid: ClientId,
    pub(crate) backupid: BackupId,
    #[arg(long, default_value = "/")]
    pub(crate) path: String,
    #[arg(long, help = "Destination file (defaults to backup-<id>.zip)")]
    pub(crate) dest: Option<PathBuf>,
    #[arg(long, help = "Print the download link instead of downloading")]
    pub(crate) print_url: bool,
}

#[derive(Args)]
pub(crate) struct DownloadClientArgs {
    pub(crate) clientid: ClientId,
    #[arg(long, value_enum)]
    pub(crate) os: OsArg,
    #[arg(long, help = "Authentication key embedded in the installer")]
    pub(crate) authkey: Option<String>,
    #[arg(long, help = "Destination file")]
    pub(crate) dest: Option<PathBuf>,
    #[arg(long, help = "Print the download link instead of downloading")]
    pub(crate) print_url: bool,
}

#[derive(Args, Default)]
pub(crate) struct UsageArgs {
    #[arg(long, help = "Ask the server to recalculate the statistics first")]
    pub(crate) recalculate: bool,
    #[arg(long)]
    pub(crate) search: Option<String>,
    #[arg(long, value_enum)]
    pub(crate) sort: Option<UsageSort>,
    #[arg(long)]
    pub(crate) desc: bool,
}

#[derive(Args)]
pub(crate) struct UsageGraphArgs {
    #[arg(long, value_enum, default_value_t = ScaleArg::Day)]
    pub(crate) scale: ScaleArg,
    #[arg(long = "client", help = "Limit the history to one client")]
    pub(crate) clientid: Option<ClientId>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackupTypeArg {
    IncrFile,
    FullFile,
    IncrImage,
    FullImage,
}

impl From<BackupTypeArg> for BackupType {
    fn from(value: BackupTypeArg) -> Self {
        match value {
            BackupTypeArg::IncrFile => Self::IncrFile,
            BackupTypeArg::FullFile => Self::FullFile,
            BackupTypeArg::IncrImage => Self::IncrImage,
            BackupTypeArg::FullImage => Self::FullImage,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OsArg {
    Windows,
    Linux,
    Mac,
}

impl From<OsArg> for OsType {
    fn from(value: OsArg) -> Self {
        match value {
            OsArg::Windows => Self::Windows,
            OsArg::Linux => Self::Linux,
            OsArg::Mac => Self::Mac,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum ScaleArg {
    #[value(alias = "d")]
    Day,
    #[value(alias = "m")]
    Month,
    #[value(alias = "y")]
    Year,
}

impl From<ScaleArg> for UsageGraphScale {
    fn from(value: ScaleArg) -> Self {
        match value {
            ScaleArg::Day => Self::Day,
            ScaleArg::Month => Self::Month,
            ScaleArg::Year => Self::Year,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum StatusSort {
    Name,
    LastFileBackup,
    LastImageBackup,
    Online,
    Group,
    Status,
}

impl From<StatusSort> for StatusColumn {
    fn from(value: StatusSort) -> Self {
        match value {
            StatusSort::Name => Self::Name,
            StatusSort::LastFileBackup => Self::LastFileBackup,
            StatusSort::LastImageBackup => Self::LastImageBackup,
            StatusSort::Online => Self::Online,
            StatusSort::Group => Self::Group,
            StatusSort::Status => Self::Status,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum UsageSort {
    Name,
    Files,
    Images,
    Used,
}

impl From<UsageSort> for UsageColumn {
    fn from(value: UsageSort) -> Self {
        match value {
            UsageSort::Name => Self::Name,
            UsageSort::Files => Self::Files,
            UsageSort::Images => Self::Images,
            UsageSort::Used => Self::Used,
        }
    }
}

pub(crate) const fn sort_direction(desc: bool) -> SortDirection {
    if desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Status(_) => "status",
        Command::StartBackup(_) => "start_backup",
        Command::RemoveClient(args) => {
            if args.stop {
                "stop_remove_client"
            } else {
                "remove_client"
            }
        }
        Command::Activities => "activities",
        Command::StopProcess(_) => "stop_process",
        Command::Watch(WatchCommand::Status(_)) => "watch_status",
        Command::Watch(WatchCommand::Activities(_)) => "watch_activities",
        Command::Backups(backups) => match backups {
            BackupsCommand::Clients => "backups_clients",
            BackupsCommand::List(_) => "backups_list",
            BackupsCommand::Files(_) => "backups_files",
            BackupsCommand::Archive(_) => "backups_archive",
            BackupsCommand::Unarchive(_) => "backups_unarchive",
            BackupsCommand::Delete(_) => "backups_delete",
            BackupsCommand::StopDelete(_) => "backups_stop_delete",
            BackupsCommand::DeleteNow(_) => "backups_delete_now",
            BackupsCommand::Mount(_) => "backups_mount",
            BackupsCommand::Download(_) => "backups_download",
            BackupsCommand::DownloadZip(_) => "backups_download_zip",
        },
        Command::DownloadClient(_) => "download_client",
        Command::Usage(_) => "usage",
        Command::Piegraph => "piegraph",
        Command::Usagegraph(_) => "usagegraph",
        Command::Users => "users",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["urbackup-admin"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn global_flags_have_defaults() {
        let cli = parse(&["--server-url", "http://backup.local:55414", "status"]);
        assert_eq!(cli.server_url.as_str(), "http://backup.local:55414/");
        assert_eq!(cli.output, OutputFormat::Table);
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        let Command::Status(args) = cli.command else {
            panic!("expected status command");
        };
        assert_eq!(args.page, 1);
        assert_eq!(args.per_page, DEFAULT_PAGE_SIZE);
        assert_eq!(args.sort, StatusSort::Name);
    }

    #[test]
    fn output_format_accepts_alias() {
        let cli = parse(&["--format", "json", "users"]);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn start_backup_parses_type_and_ids() {
        let cli = parse(&["start-backup", "full-image", "1,2", "5"]);
        let Command::StartBackup(args) = cli.command else {
            panic!("expected start-backup command");
        };
        assert_eq!(BackupType::from(args.backup_type), BackupType::FullImage);
        assert_eq!(args.ids, [1, 2, 5]);
    }

    #[test]
    fn start_backup_requires_ids() {
        let argv = ["urbackup-admin", "start-backup", "incr-file"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn usagegraph_accepts_short_scale_names() {
        let cli = parse(&["usagegraph", "--scale", "y", "--client", "3"]);
        let Command::Usagegraph(args) = cli.command else {
            panic!("expected usagegraph command");
        };
        assert_eq!(UsageGraphScale::from(args.scale), UsageGraphScale::Year);
        assert_eq!(args.clientid, Some(3));
    }

    #[test]
    fn password_flags_conflict() {
        let argv = [
            "urbackup-admin",
            "login",
            "--username",
            "admin",
            "--password",
            "pw",
            "--password-stdin",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn command_label_matches_variants() {
        let cli = parse(&["backups", "stop-delete", "1", "9"]);
        assert_eq!(command_label(&cli.command), "backups_stop_delete");
        let cli = parse(&["remove-client", "4", "--stop"]);
        assert_eq!(command_label(&cli.command), "stop_remove_client");
        let cli = parse(&["watch", "activities", "--interval-ms", "1000"]);
        assert_eq!(command_label(&cli.command), "watch_activities");
        assert_eq!(command_label(&Command::Users), "users");
    }

    #[test]
    fn value_enums_map_to_library_types() {
        assert_eq!(OsType::from(OsArg::Mac), OsType::Mac);
        assert_eq!(StatusColumn::from(StatusSort::Online), StatusColumn::Online);
        assert_eq!(UsageColumn::from(UsageSort::Used), UsageColumn::Used);
        assert_eq!(sort_direction(true), SortDirection::Descending);
        assert_eq!(sort_direction(false), SortDirection::Ascending);
    }
}
