use std::path::Path;

use color_eyre::eyre::eyre;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output to `path`. The screen belongs to the dashboard,
/// so nothing is written to stdout or stderr.
///
/// The returned guard flushes pending lines when dropped and must outlive
/// the event loop.
pub fn init(path: &Path) -> color_eyre::Result<WorkerGuard> {
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map_or_else(|| "raspi-monitor.log".into(), |n| n.to_string_lossy());

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.as_ref())
        .build(directory)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| eyre!("failed to install log subscriber: {err}"))?;
    Ok(guard)
}
