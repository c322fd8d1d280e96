//! One-shot sync engine: traversal, remote directory pre-creation, and
//! the upload worker pool.
//!
//! All per-file failures are local to the file: they are logged, counted
//! in [`SyncStats::errors`] and the worker moves on. Directory creation
//! always completes before the first upload starts; within that phase
//! parents are ensured before children.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::decision::{
    decide_file_action, is_older_than_24h, FileAction, LocalFileInfo,
};
use crate::exclude::ExcludeRules;
use crate::path_utils::{join_remote_path, normalize_remote_root, to_lower_ascii};
use crate::webdav::{parse_base_url, BaseUrl, Credentials, RemoteItemInfo, WebDavClient};

/// Totals of one run. Only meaningful after [`run_sync`] returns.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub dirs_created: u64,
    pub files_uploaded: u64,
    pub files_deleted_jpg: u64,
    pub files_deleted_old: u64,
    pub files_skipped: u64,
    pub errors: u64,
    /// local paths removed after upload, in completion order
    pub deleted_files: Vec<String>,
}

// one lock covers the counters and the deleted list so that appending a
// deleted path and bumping its sub-counter stay atomic together
#[derive(Clone)]
struct SharedStats {
    inner: Arc<Mutex<SyncStats>>,
}

impl SharedStats {
    fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(SyncStats::default())) }
    }

    fn lock(&self) -> MutexGuard<'_, SyncStats> {
        self.inner.lock().expect("stats mutex poisoned")
    }

    fn add_error(&self) {
        self.lock().errors += 1;
    }

    fn add_uploaded(&self) {
        self.lock().files_uploaded += 1;
    }

    fn add_skipped(&self) {
        self.lock().files_skipped += 1;
    }

    fn add_dir_created(&self) {
        self.lock().dirs_created += 1;
    }

    fn add_deleted(&self, path: String, is_jpg: bool, old_file: bool) {
        let mut stats = self.lock();
        stats.deleted_files.push(path);
        if is_jpg {
            stats.files_deleted_jpg += 1;
        } else if old_file {
            stats.files_deleted_old += 1;
        }
    }

    fn snapshot(&self) -> SyncStats {
        self.lock().clone()
    }
}

struct FileEntry {
    abs_path: PathBuf,
    rel_path: PathBuf,
}

fn is_jpg_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| to_lower_ascii(&ext.to_string_lossy()) == "jpg")
        .unwrap_or(false)
}

fn path_depth(path: &Path) -> usize {
    path.components().count()
}

/// Walk the source tree, pruning excluded directories, and split the
/// survivors into directories and regular files with their relative
/// paths. Iteration errors are counted but never abort the walk.
fn collect_source_tree(
    source: &Path,
    rules: &ExcludeRules,
    stats: &SharedStats,
) -> (Vec<PathBuf>, Vec<FileEntry>) {
    let mut directories = Vec::new();
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(source)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(source)
                .map(|rel| !rules.is_excluded(rel))
                .unwrap_or(true)
        });
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(walk_error) => {
                let denied = walk_error
                    .io_error()
                    .map(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
                    .unwrap_or(false);
                if !denied {
                    error!("directory iteration error: {}", walk_error);
                    stats.add_error();
                }
                continue;
            }
        };
        let rel = match entry.path().strip_prefix(source) {
            Ok(rel) => rel.to_path_buf(),
            Err(strip_error) => {
                error!("failed to build relative path for {:?}: {}", entry.path(), strip_error);
                stats.add_error();
                continue;
            }
        };
        if entry.file_type().is_dir() {
            directories.push(rel);
        } else if entry.file_type().is_file() {
            files.push(FileEntry { abs_path: entry.path().to_path_buf(), rel_path: rel });
        }
    }
    (directories, files)
}

/// Ensure every `/`-prefix of `remote_path` exists as a collection,
/// shallowest first, memoizing successes in `known_dirs`. Errors count
/// but do not stop the remaining prefixes or later uploads.
async fn ensure_remote_dir(
    client: Option<&WebDavClient>,
    remote_path: &str,
    dry_run: bool,
    known_dirs: &mut HashSet<String>,
    stats: &SharedStats,
) {
    let normalized = normalize_remote_root(remote_path);
    let mut current = String::new();
    for part in normalized.split('/').filter(|part| !part.is_empty()) {
        current.push('/');
        current.push_str(part);
        if known_dirs.contains(&current) {
            continue;
        }

        if dry_run {
            let mut exists = false;
            if let Some(client) = client {
                match client.get_info(&current).await {
                    Ok(info) => exists = info.exists,
                    Err(lookup_error) => {
                        error!("PROPFIND failed for {}: {:#}", current, lookup_error);
                        stats.add_error();
                    }
                }
            }
            if !exists {
                info!("dry-run: would create directory {}", current);
                stats.add_dir_created();
            }
            known_dirs.insert(current.clone());
            continue;
        }

        let Some(client) = client else {
            error!("WebDAV client not available for directory {}", current);
            stats.add_error();
            continue;
        };
        match client.mk_col(&current).await {
            Ok(created) => {
                if created {
                    stats.add_dir_created();
                    info!("created directory {}", current);
                }
                known_dirs.insert(current.clone());
            }
            Err(mkcol_error) => {
                error!("MKCOL failed for {}: {:#}", current, mkcol_error);
                stats.add_error();
            }
        }
    }
}

struct Worker {
    config: Arc<AppConfig>,
    base_url: BaseUrl,
    creds: Credentials,
    remote_checks: bool,
    run_start: DateTime<Utc>,
    files: Arc<Vec<FileEntry>>,
    next_index: Arc<AtomicUsize>,
    stats: SharedStats,
}

impl Worker {
    async fn run(self) {
        let client = if self.remote_checks {
            match WebDavClient::new(self.base_url.clone(), self.creds.clone()) {
                Ok(client) => Some(client),
                Err(client_error) => {
                    error!("failed to initialize WebDAV client for worker: {:#}", client_error);
                    self.stats.add_error();
                    return;
                }
            }
        } else {
            None
        };
        loop {
            let index = self.next_index.fetch_add(1, Ordering::SeqCst);
            let Some(entry) = self.files.get(index) else {
                break;
            };
            self.process_file(client.as_ref(), entry).await;
        }
    }

    async fn process_file(&self, client: Option<&WebDavClient>, entry: &FileEntry) {
        let metadata = match tokio::fs::metadata(&entry.abs_path).await {
            Ok(metadata) => metadata,
            Err(stat_error) => {
                error!("failed to stat {:?}: {}", entry.abs_path, stat_error);
                self.stats.add_error();
                return;
            }
        };
        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(time_error) => {
                error!("failed to get file time of {:?}: {}", entry.abs_path, time_error);
                self.stats.add_error();
                return;
            }
        };
        let local = LocalFileInfo {
            path: entry.abs_path.clone(),
            size: metadata.len(),
            last_modified: DateTime::<Utc>::from(modified),
            is_jpg: is_jpg_file(&entry.abs_path),
        };

        let remote_path = join_remote_path(&self.config.remote, &entry.rel_path);
        let remote = if let Some(client) = client {
            match client.get_info(&remote_path).await {
                Ok(info) => {
                    if info.exists && info.is_dir {
                        error!("remote path is a directory, expected file: {}", remote_path);
                        self.stats.add_error();
                        return;
                    }
                    info
                }
                Err(lookup_error) => {
                    error!("PROPFIND failed for {}: {:#}", remote_path, lookup_error);
                    self.stats.add_error();
                    return;
                }
            }
        } else {
            RemoteItemInfo::default()
        };

        let decision =
            decide_file_action(&local, &remote, self.config.compare_mode, self.run_start);
        let should_delete = decision.action == FileAction::UploadAndDelete;

        if decision.action == FileAction::Skip {
            info!("skip {} ({})", entry.rel_path.display(), decision.reason);
            self.stats.add_skipped();
            return;
        }

        if self.config.dry_run {
            info!("dry-run: would upload {} ({})", entry.rel_path.display(), decision.reason);
            self.stats.add_uploaded();
            if should_delete {
                info!("dry-run: would delete local {}", entry.rel_path.display());
                self.stats.add_deleted(
                    entry.abs_path.display().to_string(),
                    local.is_jpg,
                    is_older_than_24h(&local, self.run_start),
                );
            }
            return;
        }

        let Some(client) = client else {
            error!("WebDAV client not available for upload: {}", remote_path);
            self.stats.add_error();
            return;
        };
        if let Err(put_error) = client.put_file(&remote_path, &entry.abs_path).await {
            error!("PUT failed for {}: {:#}", remote_path, put_error);
            self.stats.add_error();
            return;
        }
        info!("uploaded {}", entry.rel_path.display());
        self.stats.add_uploaded();

        if should_delete {
            match tokio::fs::remove_file(&entry.abs_path).await {
                Ok(()) => {
                    info!("deleted local file {}", entry.abs_path.display());
                    self.stats.add_deleted(
                        entry.abs_path.display().to_string(),
                        local.is_jpg,
                        is_older_than_24h(&local, self.run_start),
                    );
                }
                Err(remove_error) => {
                    error!("failed to delete local file {:?}: {}", entry.abs_path, remove_error);
                    self.stats.add_error();
                }
            }
        }
    }
}

/// Run one sync pass and return the totals. Startup failures (bad base
/// URL, unusable client) count as errors and return early; everything
/// after that is per-file.
pub async fn run_sync(config: &AppConfig) -> SyncStats {
    let stats = SharedStats::new();
    let run_start = Utc::now();
    let config = Arc::new(config.clone());

    let mut rules = ExcludeRules::with_defaults();
    for pattern in &config.excludes {
        if let Err(pattern_error) = rules.add(pattern) {
            error!("{:#}", pattern_error);
            stats.add_error();
        }
    }

    let remote_checks = !config.app_password.is_empty();
    if config.dry_run && !remote_checks {
        warn!("dry-run without app password: remote checks are disabled");
    }

    let base_url = match parse_base_url(&config.base_url) {
        Ok(parts) => parts,
        Err(url_error) => {
            error!("invalid base URL: {:#}", url_error);
            stats.add_error();
            return stats.snapshot();
        }
    };
    let creds = Credentials {
        email: config.email.clone(),
        app_password: config.app_password.clone(),
    };

    let (mut directories, files) = collect_source_tree(&config.source, &rules, &stats);
    directories.sort_by_key(|dir| path_depth(dir));

    let dir_client = if remote_checks {
        match WebDavClient::new(base_url.clone(), creds.clone()) {
            Ok(client) => Some(client),
            Err(client_error) => {
                error!("failed to initialize WebDAV client for directories: {:#}", client_error);
                stats.add_error();
                return stats.snapshot();
            }
        }
    } else {
        None
    };

    let mut known_dirs = HashSet::new();
    ensure_remote_dir(dir_client.as_ref(), &config.remote, config.dry_run, &mut known_dirs, &stats)
        .await;
    for dir in &directories {
        let remote_path = join_remote_path(&config.remote, dir);
        ensure_remote_dir(dir_client.as_ref(), &remote_path, config.dry_run, &mut known_dirs, &stats)
            .await;
    }
    drop(dir_client);

    let files = Arc::new(files);
    let next_index = Arc::new(AtomicUsize::new(0));
    let worker_count = config.threads.clamp(1, files.len().max(1));
    let mut join_set = tokio::task::JoinSet::new();
    for _ in 0..worker_count {
        let worker = Worker {
            config: config.clone(),
            base_url: base_url.clone(),
            creds: creds.clone(),
            remote_checks,
            run_start,
            files: files.clone(),
            next_index: next_index.clone(),
            stats: stats.clone(),
        };
        join_set.spawn(worker.run());
    }
    while let Some(joined) = join_set.join_next().await {
        if let Err(join_error) = joined {
            error!("worker task failed: {}", join_error);
            stats.add_error();
        }
    }

    stats.snapshot()
}
