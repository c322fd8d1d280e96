//! Configuration types for a single sync run.

use crate::path_utils::to_lower_ascii;

pub const DEFAULT_REMOTE_ROOT: &str = "/PublicUploadRoot";
pub const DEFAULT_BASE_URL: &str = "https://webdav.cloud.mail.ru";
pub const DEFAULT_THREADS: usize = 1;

/// What "remote file is identical" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// size must match and the local mtime must not be newer than the
    /// remote mtime by more than the tolerance window
    #[default]
    SizeMtime,
    /// size match alone is enough
    SizeOnly,
}

impl std::str::FromStr for CompareMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match to_lower_ascii(value).as_str() {
            "size-mtime" => Ok(CompareMode::SizeMtime),
            "size-only" => Ok(CompareMode::SizeOnly),
            other => Err(anyhow::anyhow!("unknown compare mode: {}", other)),
        }
    }
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CompareMode::SizeMtime => write!(f, "size-mtime"),
            CompareMode::SizeOnly => write!(f, "size-only"),
        }
    }
}

/// Immutable input to [`crate::sync::run_sync`]. Built once by the CLI
/// layer, read-only afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// absolute path of the local tree to mirror
    pub source: std::path::PathBuf,
    /// normalized remote collection root (starts with `/`, no trailing `/`)
    pub remote: String,
    /// basic-auth username
    pub email: String,
    /// basic-auth secret; empty disables all remote checks
    pub app_password: String,
    /// scheme + host + port + base path of the WebDAV endpoint
    pub base_url: String,
    /// report planned actions without uploading or deleting
    pub dry_run: bool,
    /// worker count, >= 1
    pub threads: usize,
    pub compare_mode: CompareMode,
    /// user exclude patterns, appended after the built-in defaults
    pub excludes: Vec<String>,
}
