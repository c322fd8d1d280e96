//! Configuration assembly: flags, `uploader.conf`, environment, compiled
//! defaults — in that order of precedence.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use common::config::{DEFAULT_BASE_URL, DEFAULT_REMOTE_ROOT, DEFAULT_THREADS};
use common::path_utils::{normalize_remote_root, to_lower_ascii};
use common::AppConfig;

use crate::Args;

pub const CONFIG_FILE_NAME: &str = "uploader.conf";
pub const EMAIL_ENV: &str = "MAILRU_EMAIL";
pub const APP_PASSWORD_ENV: &str = "MAILRU_APP_PASSWORD";

/// Credentials found in `uploader.conf`. Absent keys stay `None`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub email: Option<String>,
    pub app_password: Option<String>,
}

/// Parse the INI-ish `key=value` credential file: `#`/`;` comments,
/// optional double quotes around values, case-insensitive keys, UTF-8 BOM
/// tolerated. The first occurrence of a key wins.
pub fn parse_credentials(content: &str) -> StoredCredentials {
    let mut creds = StoredCredentials::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim().trim_start_matches('\u{feff}');
        let mut value = value.trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }
        match to_lower_ascii(key).as_str() {
            "email" => {
                if creds.email.is_none() {
                    creds.email = Some(value.to_string());
                }
            }
            "app_password" | "app-password" => {
                if creds.app_password.is_none() {
                    creds.app_password = Some(value.to_string());
                }
            }
            _ => {}
        }
    }
    creds
}

pub fn load_credentials_file(path: &Path) -> Result<StoredCredentials> {
    if !path.exists() {
        return Ok(StoredCredentials::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    Ok(parse_credentials(&content))
}

/// Directory holding the running executable; falls back to the current
/// directory when that cannot be determined.
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Turn parsed arguments into a validated [`AppConfig`].
///
/// `base_dir` is where `uploader.conf` and the default source directory
/// live — the executable's directory in production.
pub fn resolve_config(args: Args, base_dir: &Path) -> Result<AppConfig> {
    let mut email = args.email.unwrap_or_default();
    let mut app_password = args.app_password.unwrap_or_default();

    if email.is_empty() || app_password.is_empty() {
        let stored = load_credentials_file(&base_dir.join(CONFIG_FILE_NAME))?;
        if email.is_empty() {
            email = stored.email.unwrap_or_default();
        }
        if app_password.is_empty() {
            app_password = stored.app_password.unwrap_or_default();
        }
    }
    if email.is_empty() {
        email = std::env::var(EMAIL_ENV).unwrap_or_default();
    }
    if app_password.is_empty() {
        app_password = std::env::var(APP_PASSWORD_ENV).unwrap_or_default();
    }

    if !app_password.is_empty() && email.is_empty() {
        bail!("--app-password requires --email");
    }
    if !args.dry_run {
        if email.is_empty() {
            bail!("missing --email (or {})", EMAIL_ENV);
        }
        if app_password.is_empty() {
            bail!("missing --app-password (or {})", APP_PASSWORD_ENV);
        }
    }

    let threads = args.threads.unwrap_or(DEFAULT_THREADS);
    if threads == 0 {
        bail!("--threads must be >= 1");
    }

    let source = match args.source {
        Some(source) => source,
        None => {
            let source = base_dir.join("p");
            std::fs::create_dir_all(&source)
                .with_context(|| format!("failed to create default source dir {:?}", source))?;
            source
        }
    };
    if !source.exists() {
        bail!("source path does not exist: {}", source.display());
    }
    if !source.is_dir() {
        bail!("source path is not a directory: {}", source.display());
    }
    let source = std::path::absolute(&source)
        .with_context(|| format!("failed to resolve source path {:?}", source))?;

    Ok(AppConfig {
        source,
        remote: normalize_remote_root(
            args.remote.as_deref().unwrap_or(DEFAULT_REMOTE_ROOT),
        ),
        email,
        app_password,
        base_url: args.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        dry_run: args.dry_run,
        threads,
        compare_mode: args.compare.unwrap_or_default(),
        excludes: args.excludes,
    })
}
