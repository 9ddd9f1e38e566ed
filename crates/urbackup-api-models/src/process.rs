//! Numeric process and client status codes reported by the server.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Kind of job a running process performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ProcessAction {
    /// No process.
    None,
    /// Incremental file backup.
    IncrFile,
    /// Full file backup.
    FullFile,
    /// Incremental image backup.
    IncrImage,
    /// Full image backup.
    FullImage,
    /// Resumed incremental file backup.
    ResumeIncrFile,
    /// Resumed full file backup.
    ResumeFullFile,
    /// Continuous data protection sync.
    CdpSync,
    /// File restore.
    RestoreFile,
    /// Image restore.
    RestoreImage,
    /// Client software update.
    Update,
    /// Database integrity check.
    CheckIntegrity,
    /// Server database backup.
    BackupDatabase,
    /// Storage statistics recalculation.
    RecalculateStatistics,
    /// Nightly cleanup.
    NightlyCleanup,
    /// Cleanup triggered by low free space.
    EmergencyCleanup,
    /// Storage migration.
    StorageMigration,
    /// Recovery after server start.
    StartupRecovery,
    /// Code this client does not know about.
    Unknown(i64),
}

impl ProcessAction {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::IncrFile => 1,
            Self::FullFile => 2,
            Self::IncrImage => 3,
            Self::FullImage => 4,
            Self::ResumeIncrFile => 5,
            Self::ResumeFullFile => 6,
            Self::CdpSync => 7,
            Self::RestoreFile => 8,
            Self::RestoreImage => 9,
            Self::Update => 10,
            Self::CheckIntegrity => 11,
            Self::BackupDatabase => 12,
            Self::RecalculateStatistics => 13,
            Self::NightlyCleanup => 14,
            Self::EmergencyCleanup => 15,
            Self::StorageMigration => 16,
            Self::StartupRecovery => 17,
            Self::Unknown(code) => code,
        }
    }

    /// Display label shown to operators.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::IncrFile => "Incremental file backup",
            Self::FullFile => "Full file backup",
            Self::IncrImage => "Incremental image backup",
            Self::FullImage => "Full image backup",
            Self::ResumeIncrFile => "Resumed incremental file backup",
            Self::ResumeFullFile => "Resumed full file backup",
            Self::CdpSync => "Continuous data protection sync",
            Self::RestoreFile => "File restore",
            Self::RestoreImage => "Image restore",
            Self::Update => "Client update",
            Self::CheckIntegrity => "Checking database integrity",
            Self::BackupDatabase => "Backing up database",
            Self::RecalculateStatistics => "Recalculating statistics",
            Self::NightlyCleanup => "Nightly cleanup",
            Self::EmergencyCleanup => "Emergency cleanup",
            Self::StorageMigration => "Storage migration",
            Self::StartupRecovery => "Startup recovery",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// True for incremental and full file backups.
    #[must_use]
    pub const fn is_file_backup(self) -> bool {
        matches!(self, Self::IncrFile | Self::FullFile)
    }

    /// True for incremental and full image backups.
    #[must_use]
    pub const fn is_image_backup(self) -> bool {
        matches!(self, Self::IncrImage | Self::FullImage)
    }
}

impl From<i64> for ProcessAction {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::None,
            1 => Self::IncrFile,
            2 => Self::FullFile,
            3 => Self::IncrImage,
            4 => Self::FullImage,
            5 => Self::ResumeIncrFile,
            6 => Self::ResumeFullFile,
            7 => Self::CdpSync,
            8 => Self::RestoreFile,
            9 => Self::RestoreImage,
            10 => Self::Update,
            11 => Self::CheckIntegrity,
            12 => Self::BackupDatabase,
            13 => Self::RecalculateStatistics,
            14 => Self::NightlyCleanup,
            15 => Self::EmergencyCleanup,
            16 => Self::StorageMigration,
            17 => Self::StartupRecovery,
            other => Self::Unknown(other),
        }
    }
}

impl From<ProcessAction> for i64 {
    fn from(action: ProcessAction) -> Self {
        action.code()
    }
}

impl Display for ProcessAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Connection problems reported in place of a process for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientSpecificStatus {
    /// Server identity was rejected by the client.
    IdentError,
    /// Client limit reached.
    TooManyClients,
    /// Client authentication failed.
    AuthenticationError,
    /// Client unique id changed.
    UidChanged,
    /// Authentication in progress.
    Authenticating,
    /// Fetching settings from the client.
    GettingSettings,
    /// Client is starting up.
    StartingUp,
}

impl ClientSpecificStatus {
    /// Parse one of the client-specific codes (11 through 17).
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            11 => Some(Self::IdentError),
            12 => Some(Self::TooManyClients),
            13 => Some(Self::AuthenticationError),
            14 => Some(Self::UidChanged),
            15 => Some(Self::Authenticating),
            16 => Some(Self::GettingSettings),
            17 => Some(Self::StartingUp),
            _ => None,
        }
    }

    /// Display label shown to operators.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::IdentError => "Server rejected",
            Self::TooManyClients => "Too many clients",
            Self::AuthenticationError => "Authentication failed",
            Self::UidChanged => "Client UID changed",
            Self::Authenticating => "Authenticating",
            Self::GettingSettings => "Getting settings",
            Self::StartingUp => "Starting up",
        }
    }
}

/// Decoded `status` column of a client row.
///
/// Codes 11 through 17 overlap between both tables; the status list uses
/// them for connection states, so those take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatusCode {
    /// The client is running (or idle with) the given process.
    Process(ProcessAction),
    /// The client reports a connection state.
    Specific(ClientSpecificStatus),
}

impl ClientStatusCode {
    /// Decode a raw status value.
    #[must_use]
    pub fn from_code(code: i64) -> Self {
        ClientSpecificStatus::from_code(code)
            .map_or_else(|| Self::Process(ProcessAction::from(code)), Self::Specific)
    }

    /// Display label shown to operators.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Process(ProcessAction::None) => "Ok",
            Self::Process(action) => action.label(),
            Self::Specific(status) => status.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_action_codes_round_trip_through_i64() {
        for code in 0..=17 {
            assert_eq!(ProcessAction::from(code).code(), code);
        }
        assert_eq!(ProcessAction::from(99), ProcessAction::Unknown(99));
    }

    #[test]
    fn process_action_deserializes_from_number() {
        let action: ProcessAction = serde_json::from_str("4").expect("valid code");
        assert_eq!(action, ProcessAction::FullImage);
        assert!(action.is_image_backup());
        assert!(!action.is_file_backup());
    }

    #[test]
    fn client_status_prefers_specific_codes() {
        assert_eq!(
            ClientStatusCode::from_code(13),
            ClientStatusCode::Specific(ClientSpecificStatus::AuthenticationError)
        );
        assert_eq!(
            ClientStatusCode::from_code(1),
            ClientStatusCode::Process(ProcessAction::IncrFile)
        );
        assert_eq!(ClientStatusCode::from_code(0).label(), "Ok");
    }
}
