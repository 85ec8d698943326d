//! Structured logging using the tracing crate.
//!
//! Logs go to a daily-rotated file under the XDG state directory, never to
//! the terminal, which belongs to the waveform display. Only the newest
//! seven log files are kept.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Base name of the rolling log files.
pub const LOG_FILE_PREFIX: &str = "sound-displayer.log";

const MAX_LOG_FILES: usize = 7;

/// Keeps the non-blocking writer flushing for the life of the process.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes file-based logging.
///
/// Log level comes from RUST_LOG (default "info").
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> Result<(), anyhow::Error> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;

    if let Err(e) = cleanup_old_logs(&log_dir) {
        eprintln!("Warning: Failed to cleanup old logs: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_names(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging initialized. Log file: {}", log_dir.display());
    Ok(())
}

/// The log directory: `$XDG_STATE_HOME/sound-displayer`, falling back to
/// `~/.local/state/sound-displayer`. Not created here.
pub fn log_dir() -> Result<PathBuf, anyhow::Error> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg_state).join("sound-displayer"));
    }

    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".local/state/sound-displayer"))
}

/// Whether `file_name` is a dated rotation of our log, e.g.
/// `sound-displayer.log.2026-10-19`.
fn is_rotated_log(file_name: &str) -> bool {
    file_name
        .strip_prefix(LOG_FILE_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(|date| date.matches('-').count() == 2)
}

/// Removes all but the newest [`MAX_LOG_FILES`] rotated log files.
fn cleanup_old_logs(log_dir: &Path) -> Result<(), anyhow::Error> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let file_name = path.file_name()?.to_string_lossy().to_string();

            if is_rotated_log(&file_name) {
                let modified = fs::metadata(&path).ok()?.modified().ok()?;
                Some((path, modified))
            } else {
                None
            }
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(MAX_LOG_FILES) {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }

    Ok(())
}
