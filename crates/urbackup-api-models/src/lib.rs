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
//! Shared JSON DTOs for the UrBackup server API.
//!
//! These types are used by the client library for response decoding and by
//! the CLI for rendering, so the wire contract lives in one place. Fields the
//! server omits on older versions default to zero/empty; fields every version
//! sends stay required so a malformed response surfaces as a decode failure.

pub mod activity;
pub mod process;

use serde::{Deserialize, Serialize};

pub use activity::{ActivityAction, ActivityFlags, classify_activity};
pub use process::{ClientSpecificStatus, ClientStatusCode, ProcessAction};

/// Numeric identifier of a backup client.
pub type ClientId = i64;

/// Numeric identifier of a stored backup.
pub type BackupId = i64;

/// Response of the `salt` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaltResponse {
    /// Per-user salt prepended to the password.
    pub salt: String,
    /// Per-login random challenge.
    pub rnd: String,
    #[serde(default)]
    /// PBKDF2 iteration count; zero disables stretching.
    pub pbkdf2_rounds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Error code when the lookup failed.
    pub error: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Session created for the challenge.
    pub ses: Option<String>,
}

/// Response of the `login` action, also used for anonymous probes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct LoginResponse {
    /// Whether the session is authenticated.
    pub success: Option<bool>,
    /// Session token to attach to later requests.
    pub session: Option<String>,
    /// Whether credentials are checked by an external directory.
    pub ldap_enabled: Option<bool>,
    /// Set while the server migrates its database.
    pub upgrading_database: Option<bool>,
    /// Current database schema version during an upgrade.
    pub curr_db_version: Option<i64>,
    /// Target database schema version during an upgrade.
    pub target_db_version: Option<i64>,
    /// Set while the file entry cache is built.
    pub creating_filescache: Option<bool>,
    /// File entries processed while building the cache.
    pub processed_file_entries: Option<i64>,
    /// Progress of the cache build in percent.
    pub percent_finished: Option<i64>,
    /// Restriction of the web interface to administrators.
    pub admin_only: Option<String>,
    /// API revision spoken by the server.
    pub api_version: Option<i64>,
    /// Preferred interface language.
    pub lang: Option<String>,
    /// Error code when the login failed.
    pub error: Option<i64>,
    /// Permission for the status view.
    pub status: Option<String>,
    /// Permission for statistics graphs.
    pub graph: Option<String>,
    /// Permission for the activities view.
    pub progress: Option<String>,
    /// Permission for backup browsing.
    pub browse_backups: Option<String>,
    /// Permission for settings.
    pub settings: Option<String>,
    /// Permission for logs.
    pub logs: Option<String>,
}

impl LoginResponse {
    /// True when the server reported an authenticated session.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(false)
    }
}

/// Process summary embedded in a client status row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientProcessItem {
    /// Kind of the running job.
    pub action: ProcessAction,
    #[serde(default)]
    /// Percentage done, negative while indexing.
    pub pcdone: i64,
}

/// Per-client backup health snapshot from the `status` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusClientItem {
    /// Client identifier.
    pub id: ClientId,
    /// Client name.
    pub name: String,
    #[serde(default)]
    /// Unix time of the last file backup, zero if never.
    pub lastbackup: i64,
    #[serde(default)]
    /// Unix time of the last image backup, zero if never.
    pub lastbackup_image: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    /// `"1"` when the client is scheduled for removal.
    pub delete_pending: String,
    #[serde(default)]
    /// Client unique identifier.
    pub uid: String,
    #[serde(default)]
    /// Issues reported by the last file backup.
    pub last_filebackup_issues: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Set when no backup paths are configured.
    pub no_backup_paths: Option<bool>,
    #[serde(default)]
    /// Client group name.
    pub groupname: String,
    #[serde(default)]
    /// Whether file backups are within their interval.
    pub file_ok: bool,
    #[serde(default)]
    /// Whether image backups are within their interval.
    pub image_ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Set when file backups are disabled.
    pub file_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Set when image backups are disabled.
    pub image_disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Set when the client cannot produce images.
    pub image_not_supported: Option<bool>,
    #[serde(default)]
    /// Whether the client is connected.
    pub online: bool,
    #[serde(default)]
    /// Last known address.
    pub ip: String,
    #[serde(default)]
    /// Installed client version.
    pub client_version_string: String,
    #[serde(default)]
    /// Client operating system version.
    pub os_version_string: String,
    #[serde(default)]
    /// Simplified operating system name.
    pub os_simple: String,
    #[serde(default)]
    /// Raw status code, see [`ClientStatusCode`].
    pub status: i64,
    #[serde(default)]
    /// Unix time the client was last seen.
    pub lastseen: i64,
    #[serde(default)]
    /// Processes currently running for the client.
    pub processes: Vec<ClientProcessItem>,
}

impl StatusClientItem {
    /// True when the client is scheduled for removal.
    #[must_use]
    pub fn is_delete_pending(&self) -> bool {
        self.delete_pending == "1"
    }

    /// Decoded status column.
    #[must_use]
    pub fn status_code(&self) -> ClientStatusCode {
        ClientStatusCode::from_code(self.status)
    }

    /// Running file backups with known progress.
    pub fn file_backup_processes(&self) -> impl Iterator<Item = &ClientProcessItem> {
        self.processes
            .iter()
            .filter(|process| process.action.is_file_backup() && process.pcdone > -1)
    }

    /// Running image backups with known progress.
    pub fn image_backup_processes(&self) -> impl Iterator<Item = &ClientProcessItem> {
        self.processes
            .iter()
            .filter(|process| process.action.is_image_backup() && process.pcdone > -1)
    }
}

/// Response of the `status` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Whether a status check is configured.
    pub has_status_check: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Backups stalled on missing space.
    pub nospc_stalled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Backups failing on missing space.
    pub nospc_fatal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Server database reported an error.
    pub database_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Permission to modify clients.
    pub allow_modify_clients: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Permission to remove clients.
    pub remove_client: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Permission to add clients.
    pub allow_add_client: Option<bool>,
    #[serde(default)]
    /// Image backups are disabled server-wide.
    pub no_images: bool,
    #[serde(default)]
    /// File backups are disabled server-wide.
    pub no_file_backups: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Current user is an administrator.
    pub admin: Option<bool>,
    #[serde(default)]
    /// Server identity string.
    pub server_identity: String,
    #[serde(default)]
    /// Server public key.
    pub server_pubkey: String,
    /// Client rows.
    pub status: Vec<StatusClientItem>,
}

/// Backup kinds that can be started on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupType {
    /// Incremental file backup.
    IncrFile,
    /// Full file backup.
    FullFile,
    /// Incremental image backup.
    IncrImage,
    /// Full image backup.
    FullImage,
}

impl BackupType {
    /// Wire value of the `start_type` parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncrFile => "incr_file",
            Self::FullFile => "full_file",
            Self::IncrImage => "incr_image",
            Self::FullImage => "full_image",
        }
    }
}

/// Outcome of starting a backup for one client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartBackupResultItem {
    /// Requested backup kind.
    pub start_type: BackupType,
    /// Client the backup was requested for.
    pub clientid: ClientId,
    /// Whether the server queued the backup.
    pub start_ok: bool,
}

/// Response of the `start_backup` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartBackupResponse {
    /// One entry per requested client.
    pub result: Vec<StartBackupResultItem>,
}

/// A job currently running on the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessItem {
    /// Kind of the running job.
    pub action: ProcessAction,
    #[serde(default)]
    /// Percentage done, negative while indexing.
    pub pcdone: i64,
    #[serde(default)]
    /// Estimated milliseconds until completion.
    pub eta_ms: i64,
    #[serde(default)]
    /// Current speed in bytes per millisecond.
    pub speed_bpms: f64,
    #[serde(default)]
    /// Bytes to transfer in total.
    pub total_bytes: i64,
    #[serde(default)]
    /// Bytes already transferred.
    pub done_bytes: i64,
    #[serde(default)]
    /// Whether a log can be shown for the job.
    pub can_show_backup_log: bool,
    #[serde(default)]
    /// Whether the job can be stopped.
    pub can_stop_backup: bool,
    /// Client the job runs for.
    pub clientid: ClientId,
    #[serde(default)]
    /// More detailed percentage.
    pub detail_pc: i64,
    #[serde(default)]
    /// What the job is currently doing.
    pub details: String,
    /// Process identifier.
    pub id: i64,
    #[serde(default)]
    /// Log identifier.
    pub logid: i64,
    #[serde(default)]
    /// Client name.
    pub name: String,
    #[serde(default)]
    /// Speed history, one sample per second.
    pub past_speed_bpms: Vec<f64>,
    #[serde(default)]
    /// Whether the job is paused.
    pub paused: bool,
    #[serde(default)]
    /// Queued files or objects.
    pub queue: i64,
}

/// A completed or in-progress backup, restore or deletion event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityItem {
    /// Activity or backup identifier.
    pub id: i64,
    /// Client that had the activity.
    pub clientid: ClientId,
    #[serde(default)]
    /// Client name.
    pub name: String,
    #[serde(default, deserialize_with = "lenient::int")]
    /// Non-zero for restores.
    pub restore: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    /// Non-zero for image backups.
    pub image: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    /// Non-zero for resumed backups.
    pub resumed: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    /// Positive for incremental backups.
    pub incremental: i64,
    #[serde(default, deserialize_with = "lenient::boolean")]
    /// Set for deletions.
    pub del: bool,
    #[serde(default)]
    /// Size in bytes, negative for freed space.
    pub size_bytes: i64,
    #[serde(default)]
    /// Duration in seconds.
    pub duration: i64,
    #[serde(default)]
    /// Unix time of the activity.
    pub backuptime: i64,
    #[serde(default)]
    /// Additional detail such as the volume.
    pub details: String,
}

impl ActivityItem {
    /// Flags driving [`classify_activity`].
    #[must_use]
    pub const fn flags(&self) -> ActivityFlags {
        ActivityFlags {
            restore: self.restore,
            image: self.image,
            resumed: self.resumed,
            incremental: self.incremental,
            del: self.del,
        }
    }

    /// Action label for the activity.
    #[must_use]
    pub const fn action(&self) -> ActivityAction {
        classify_activity(&self.flags())
    }
}

/// Response of the `progress` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressResponse {
    /// Running jobs.
    pub progress: Vec<ProcessItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Recent activities when requested.
    pub lastacts: Option<Vec<ActivityItem>>,
}

/// Client entry in the backups overview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupsClient {
    /// Client identifier.
    pub id: ClientId,
    /// Client name.
    pub name: String,
    #[serde(default)]
    /// Unix time of the last file backup, zero if never.
    pub lastbackup: i64,
}

/// Response of `backups` without a sub-action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupsClientsResponse {
    /// Clients with browsable backups.
    pub clients: Vec<BackupsClient>,
}

/// One stored backup of a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backup {
    /// Backup identifier.
    pub id: BackupId,
    /// Unix time the backup was taken.
    pub backuptime: i64,
    #[serde(default)]
    /// Non-zero for incremental backups.
    pub incremental: i64,
    #[serde(default)]
    /// Size in bytes.
    pub size_bytes: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    /// `1` when exempt from automatic deletion.
    pub archived: i64,
    #[serde(default)]
    /// Unix time the archive flag expires, zero if never.
    pub archive_timeout: i64,
    #[serde(default, deserialize_with = "lenient::boolean")]
    /// Set when the backup is queued for deletion.
    pub delete_pending: bool,
    #[serde(default, deserialize_with = "lenient::boolean")]
    /// Set when deletion is not permitted.
    pub disable_delete: bool,
}

impl Backup {
    /// True when the backup is archived.
    #[must_use]
    pub const fn is_archived(&self) -> bool {
        self.archived == 1
    }

    /// True when a delete action may be offered.
    #[must_use]
    pub const fn can_delete(&self) -> bool {
        !self.disable_delete && !self.is_archived()
    }
}

/// Response of `backups` with `sa=backups`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientBackupsResponse {
    #[serde(default)]
    /// Client name, empty for unknown clients.
    pub clientname: String,
    #[serde(default)]
    /// Client identifier.
    pub clientid: ClientId,
    /// Stored backups, newest first.
    pub backups: Vec<Backup>,
}

/// Entry of a backup directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupFile {
    /// Entry name.
    pub name: String,
    #[serde(default)]
    /// Whether the entry is a directory.
    pub dir: bool,
    #[serde(default)]
    /// Size in bytes.
    pub size: i64,
    #[serde(default)]
    /// Unix time of last modification.
    pub r#mod: i64,
    #[serde(default)]
    /// Unix time of creation.
    pub creat: i64,
    #[serde(default)]
    /// Unix time of last access.
    pub access: i64,
}

/// Response of `backups` with `sa=files` or `sa=mount`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupFilesResponse {
    #[serde(default)]
    /// Client name.
    pub clientname: String,
    #[serde(default)]
    /// Client identifier.
    pub clientid: ClientId,
    #[serde(default)]
    /// Backup identifier.
    pub backupid: BackupId,
    #[serde(default)]
    /// Unix time the backup was taken.
    pub backuptime: i64,
    #[serde(default)]
    /// Listed path inside the backup.
    pub path: String,
    /// Directory entries.
    pub files: Vec<BackupFile>,
}

/// User account visible to the current session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserItem {
    /// User identifier.
    pub id: i64,
    /// User name.
    pub name: String,
}

/// Response of the `users` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsersResponse {
    /// Known users.
    pub users: Vec<UserItem>,
}

/// Storage used by one client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageClientStat {
    /// Client name.
    pub name: String,
    #[serde(default)]
    /// Bytes used by file backups.
    pub files: f64,
    #[serde(default)]
    /// Bytes used by image backups.
    pub images: f64,
    #[serde(default)]
    /// Bytes used in total.
    pub used: f64,
}

/// Response of the `usage` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageResponse {
    /// Per-client usage.
    pub usage: Vec<UsageClientStat>,
}

/// Slice of the storage allocation chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PieSlice {
    /// Client name.
    pub label: String,
    /// Bytes allocated.
    pub data: f64,
}

/// Response of the `piegraph` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PieGraphResponse {
    /// Chart slices.
    pub data: Vec<PieSlice>,
}

/// Point of the storage usage history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsagePoint {
    /// Date label of the sample.
    pub xlabel: String,
    /// Storage used in megabytes.
    pub data: f64,
}

/// Response of the `usagegraph` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageGraphResponse {
    /// Samples in chronological order.
    pub data: Vec<UsagePoint>,
}

/// Resolution of the storage usage history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageGraphScale {
    /// One sample per day.
    #[serde(rename = "d")]
    Day,
    /// One sample per month.
    #[serde(rename = "m")]
    Month,
    /// One sample per year.
    #[serde(rename = "y")]
    Year,
}

impl UsageGraphScale {
    /// Wire value of the `scale` parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "d",
            Self::Month => "m",
            Self::Year => "y",
        }
    }
}

/// Operating system of a client installer download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsType {
    /// Windows installer.
    Windows,
    /// Linux installer.
    Linux,
    /// macOS installer.
    Mac,
}

impl OsType {
    /// Wire value of the `os` parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Mac => "mac",
        }
    }
}

mod lenient {
    //! Decoders for fields the server emits as numbers, booleans or strings
    //! depending on the code path that produced them.

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::{Number, Value};

    pub(crate) fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Bool(flag) => Ok(i64::from(flag)),
            Value::Number(number) => Ok(number_to_int(&number)),
            Value::String(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(0);
                }
                text.parse::<i64>()
                    .ok()
                    .or_else(|| {
                        text.parse::<f64>()
                            .ok()
                            .filter(|value| value.is_finite())
                            .map(truncate)
                    })
                    .ok_or_else(|| {
                        D::Error::custom(format!("expected an integer, got \"{text}\""))
                    })
            }
            Value::Null => Ok(0),
            other => Err(D::Error::custom(format!("expected an integer, got {other}"))),
        }
    }

    fn number_to_int(number: &Number) -> i64 {
        number
            .as_i64()
            .or_else(|| number.as_f64().map(truncate))
            .unwrap_or_default()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn truncate(value: f64) -> i64 {
        value.trunc() as i64
    }

    pub(crate) fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(flag) => flag,
            Value::Number(number) => number.as_i64().is_some_and(|value| value != 0),
            Value::String(text) => matches!(text.trim(), "1" | "true"),
            _ => false,
        })
    }

    pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => text,
            Value::Null => String::new(),
            Value::Bool(flag) => if flag { "1" } else { "0" }.to_string(),
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn activity_item_accepts_numeric_and_boolean_flags() {
        let numeric: ActivityItem = serde_json::from_value(json!({
            "id": 4, "clientid": 2, "name": "laptop", "restore": 0, "image": 1,
            "resumed": 0, "incremental": 1, "del": 1, "size_bytes": -2048,
            "duration": 12, "backuptime": 1_700_000_000, "details": "C:"
        }))
        .expect("numeric flags");
        assert!(numeric.del);
        assert_eq!(numeric.action(), ActivityAction::DelIncrImage);

        let boolean: ActivityItem = serde_json::from_value(json!({
            "id": 5, "clientid": 2, "restore": true, "image": false, "del": false
        }))
        .expect("boolean flags");
        assert_eq!(boolean.action(), ActivityAction::RestoreFile);
    }

    #[test]
    fn status_client_filters_running_backups() {
        let item: StatusClientItem = serde_json::from_value(json!({
            "id": 1,
            "name": "server",
            "delete_pending": 1,
            "processes": [
                {"action": 1, "pcdone": 40},
                {"action": 3, "pcdone": -1},
                {"action": 4, "pcdone": 10},
                {"action": 13, "pcdone": 90}
            ]
        }))
        .expect("status row");

        assert!(item.is_delete_pending());
        assert_eq!(item.file_backup_processes().count(), 1);
        let images: Vec<_> = item.image_backup_processes().collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].action, ProcessAction::FullImage);
    }

    #[test]
    fn status_response_requires_client_list() {
        let err = serde_json::from_value::<StatusResponse>(json!({"no_images": true}))
            .expect_err("missing status list");
        assert!(err.to_string().contains("status"));
    }

    #[test]
    fn backup_archive_and_delete_flags() {
        let backup: Backup = serde_json::from_value(json!({
            "id": 9, "backuptime": 1, "archived": 1, "delete_pending": 0
        }))
        .expect("backup");
        assert!(backup.is_archived());
        assert!(!backup.can_delete());
        assert!(!backup.delete_pending);
    }

    #[test]
    fn float_flags_keep_their_meaning() {
        let item: ActivityItem = serde_json::from_value(json!({
            "id": 5, "clientid": 2, "name": "laptop", "restore": 0, "image": 1.0,
            "resumed": "0", "incremental": "2.0", "del": false, "size_bytes": 0,
            "duration": 1, "backuptime": 0
        }))
        .expect("float flags");
        assert_eq!(item.action(), ActivityAction::IncrImage);
    }

    #[test]
    fn unparseable_flag_is_rejected() {
        let err = serde_json::from_value::<ActivityItem>(json!({
            "id": 5, "clientid": 2, "name": "laptop", "image": "yes"
        }))
        .expect_err("non-numeric flag");
        assert!(err.to_string().contains("expected an integer"));
    }

    #[test]
    fn enum_wire_values() {
        assert_eq!(BackupType::FullImage.as_str(), "full_image");
        assert_eq!(UsageGraphScale::Year.as_str(), "y");
        assert_eq!(OsType::Mac.as_str(), "mac");
        let parsed: BackupType = serde_json::from_str("\"incr_file\"").expect("start type");
        assert_eq!(parsed, BackupType::IncrFile);
    }
}
