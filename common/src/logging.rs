//! Log sink wiring.
//!
//! Every line is `YYYY-MM-DD HH:MM:SS [LEVEL] message` in local wall-clock
//! time. Lines go to one file per day under the log directory
//! (`YYYY-MM-DD.log`); ERROR is mirrored to stderr and everything else to
//! stdout. The subscriber is multi-producer safe, workers log through it
//! concurrently.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::{filter_fn, LevelFilter};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

struct LogLine;

impl<S, N> FormatEvent<S, N> for LogLine
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        write!(
            writer,
            "{} [{}] ",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn daily_log_path(log_dir: &std::path::Path) -> std::path::PathBuf {
    log_dir.join(format!("{}.log", chrono::Local::now().format("%Y-%m-%d")))
}

/// Install the process-wide subscriber. Called once at startup, before
/// the engine emits anything.
pub fn init(log_dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {:?}", log_dir))?;
    let log_path = daily_log_path(log_dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {:?}", log_path))?;

    let file_layer = fmt::layer()
        .event_format(LogLine)
        .with_writer(Arc::new(log_file));
    let stdout_layer = fmt::layer()
        .event_format(LogLine)
        .with_writer(std::io::stdout)
        .with_filter(filter_fn(|metadata| *metadata.level() != Level::ERROR));
    let stderr_layer = fmt::layer()
        .event_format(LogLine)
        .with_writer(std::io::stderr)
        .with_filter(filter_fn(|metadata| *metadata.level() == Level::ERROR));

    tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(file_layer)
        .with(stdout_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}
