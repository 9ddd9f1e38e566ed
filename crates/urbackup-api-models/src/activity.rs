//! Classification of finished activities into human readable actions.
//!
//! # Design
//! - The decision order is part of the contract: restores win over every
//!   other flag, then the file/image split, then resumed, incremental and
//!   deletion markers.
//! - Resumed file backups ignore the deletion flag. The server never reports a
//!   resumed deletion, so no label exists for that combination.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Flags copied from an activity record that drive classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivityFlags {
    /// Non-zero when the activity restored data to the client.
    pub restore: i64,
    /// Non-zero when the activity concerned an image backup.
    pub image: i64,
    /// Non-zero when a previously interrupted backup was resumed.
    pub resumed: i64,
    /// Positive when the backup was incremental.
    pub incremental: i64,
    /// Set when the activity removed a backup.
    pub del: bool,
}

/// Action label assigned to a finished activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// No classification applies.
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
    /// File restore.
    RestoreFile,
    /// Image restore.
    RestoreImage,
    /// Removal of an incremental file backup.
    DelIncrFile,
    /// Removal of a full file backup.
    DelFullFile,
    /// Removal of an incremental image backup.
    DelIncrImage,
    /// Removal of a full image backup.
    DelFullImage,
}

impl ActivityAction {
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
            Self::RestoreFile => "File restore",
            Self::RestoreImage => "Image restore",
            Self::DelIncrFile => "Deleting incremental file backup",
            Self::DelFullFile => "Deleting full file backup",
            Self::DelIncrImage => "Deleting incremental image backup",
            Self::DelFullImage => "Deleting full image backup",
        }
    }
}

impl Display for ActivityAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Map activity flags to exactly one action. First match wins.
#[must_use]
pub const fn classify_activity(flags: &ActivityFlags) -> ActivityAction {
    if flags.restore != 0 && flags.image == 0 {
        return ActivityAction::RestoreFile;
    }
    if flags.restore != 0 && flags.image != 0 {
        return ActivityAction::RestoreImage;
    }

    let incremental = flags.incremental > 0;

    if flags.image == 0 {
        if flags.resumed != 0 {
            return if incremental {
                ActivityAction::ResumeIncrFile
            } else {
                ActivityAction::ResumeFullFile
            };
        }
        return match (incremental, flags.del) {
            (true, true) => ActivityAction::DelIncrFile,
            (true, false) => ActivityAction::IncrFile,
            (false, true) => ActivityAction::DelFullFile,
            (false, false) => ActivityAction::FullFile,
        };
    }

    if flags.image != 0 {
        return match (incremental, flags.del) {
            (true, true) => ActivityAction::DelIncrImage,
            (true, false) => ActivityAction::IncrImage,
            (false, true) => ActivityAction::DelFullImage,
            (false, false) => ActivityAction::FullImage,
        };
    }

    ActivityAction::None
}
