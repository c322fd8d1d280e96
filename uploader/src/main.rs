use anyhow::Result;
use structopt::StructOpt;
use tracing::info;

mod settings;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "uploader",
    about = "One-shot uploader mirroring a local directory tree to a Mail.ru Cloud WebDAV collection.

Files are uploaded when missing or different on the remote. JPG files are
always re-uploaded and their local copies removed; any other uploaded file
last modified more than 24 hours ago is removed locally as well.

Credentials are taken from the command line, then uploader.conf next to
the executable, then the MAILRU_EMAIL / MAILRU_APP_PASSWORD environment
variables. Without an app password only --dry-run is possible and remote
checks are skipped entirely."
)]
pub(crate) struct Args {
    /// Source directory (default: <exe_dir>/p, created if missing)
    #[structopt(long, parse(from_os_str))]
    source: Option<std::path::PathBuf>,

    /// Mail.ru account email (basic-auth username)
    #[structopt(long)]
    email: Option<String>,

    /// App password; required unless --dry-run
    #[structopt(long = "app-password")]
    app_password: Option<String>,

    /// Remote collection root (default: /PublicUploadRoot)
    #[structopt(long)]
    remote: Option<String>,

    /// WebDAV base URL (default: https://webdav.cloud.mail.ru)
    #[structopt(long = "base-url")]
    base_url: Option<String>,

    /// Show planned actions without uploading or deleting anything
    #[structopt(long = "dry-run")]
    dry_run: bool,

    /// Number of worker threads (default: 1)
    #[structopt(long)]
    threads: Option<usize>,

    /// Exclude glob pattern, repeatable
    #[structopt(long = "exclude", number_of_values = 1)]
    excludes: Vec<String>,

    /// Comparison mode: size-mtime (default) or size-only
    #[structopt(long)]
    compare: Option<common::CompareMode>,
}

async fn async_main(config: common::AppConfig) -> common::SyncStats {
    info!("start");
    info!("mode: {}", if config.dry_run { "dry-run" } else { "sync" });
    info!("source: {}", config.source.display());
    info!("remote: {}", config.remote);
    info!("email: {}", config.email);
    info!("base URL: {}", config.base_url);
    info!("threads: {}", config.threads);
    info!("compare: {}", config.compare_mode);

    let stats = common::run_sync(&config).await;

    info!("summary:");
    info!("  dirs created: {}", stats.dirs_created);
    info!("  files uploaded: {}", stats.files_uploaded);
    info!("  files deleted (jpg): {}", stats.files_deleted_jpg);
    info!("  files deleted (>24h): {}", stats.files_deleted_old);
    info!("  files skipped: {}", stats.files_skipped);
    info!("  errors: {}", stats.errors);
    if !stats.deleted_files.is_empty() {
        info!("deleted local files:");
        for file in &stats.deleted_files {
            info!("  {}", file);
        }
    }
    info!("finish");
    stats
}

fn main() -> Result<()> {
    let args = Args::from_args();
    let base_dir = settings::exe_dir();
    let config = match settings::resolve_config(args, &base_dir) {
        Ok(config) => config,
        Err(config_error) => {
            eprintln!("error: {:#}", config_error);
            eprintln!("run with --help for usage");
            std::process::exit(1);
        }
    };
    common::logging::init(std::path::Path::new("logs"))?;
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let stats = runtime.block_on(async_main(config));
    if stats.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}
