//! Per-file action policy.
//!
//! Pure functions over gathered facts: what we know about the local file,
//! what the remote reported, the comparison mode, and when the run
//! started. The returned reason strings end up in the log and are relied
//! on by tests, so they are part of the contract.

use chrono::{DateTime, Duration, Utc};

use crate::config::CompareMode;
use crate::webdav::RemoteItemInfo;

/// Modification times within this window count as equal.
const MTIME_TOLERANCE_SECS: i64 = 2;
/// Local files last modified this long before the run start are removed
/// after a successful upload.
const LOCAL_AGE_CUTOFF_HOURS: i64 = 24;

/// Facts about one local file, gathered once per file by a worker.
#[derive(Debug, Clone)]
pub struct LocalFileInfo {
    pub path: std::path::PathBuf,
    pub size: u64,
    /// filesystem mtime projected into the wall-clock domain
    pub last_modified: DateTime<Utc>,
    /// extension equals `.jpg`, case-insensitively
    pub is_jpg: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Skip,
    Upload,
    UploadAndDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDecision {
    pub action: FileAction,
    pub reason: &'static str,
}

/// Whether the local file differs from what the remote reported.
///
/// Remote-newer-than-local is not a difference; only a local mtime more
/// than the tolerance ahead of the remote one is.
pub fn is_different(local: &LocalFileInfo, remote: &RemoteItemInfo, mode: CompareMode) -> bool {
    if !remote.exists {
        return true;
    }
    let Some(remote_size) = remote.size else {
        return true;
    };
    if remote_size != local.size {
        return true;
    }
    if mode == CompareMode::SizeOnly {
        return false;
    }
    let Some(remote_modified) = remote.last_modified else {
        return true;
    };
    local.last_modified > remote_modified + Duration::seconds(MTIME_TOLERANCE_SECS)
}

pub fn is_older_than_24h(local: &LocalFileInfo, run_start: DateTime<Utc>) -> bool {
    local.last_modified < run_start - Duration::hours(LOCAL_AGE_CUTOFF_HOURS)
}

/// Map the gathered facts onto skip / upload / upload-then-delete-local.
///
/// JPG files are unconditional: always uploaded, always removed locally,
/// regardless of age or remote content.
pub fn decide_file_action(
    local: &LocalFileInfo,
    remote: &RemoteItemInfo,
    mode: CompareMode,
    run_start: DateTime<Utc>,
) -> FileDecision {
    if local.is_jpg {
        return FileDecision {
            action: FileAction::UploadAndDelete,
            reason: if remote.exists { "jpg overwrite" } else { "jpg upload" },
        };
    }

    let old = is_older_than_24h(local, run_start);

    if !remote.exists {
        return if old {
            FileDecision { action: FileAction::UploadAndDelete, reason: "upload + delete (old)" }
        } else {
            FileDecision { action: FileAction::Upload, reason: "upload (missing)" }
        };
    }

    if is_different(local, remote, mode) {
        return if old {
            FileDecision { action: FileAction::UploadAndDelete, reason: "upload + delete (old diff)" }
        } else {
            FileDecision { action: FileAction::Upload, reason: "upload (diff)" }
        };
    }

    FileDecision { action: FileAction::Skip, reason: "skip (same)" }
}
