//! Display recent log entries from the application.

use anyhow::anyhow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{log_dir, LOG_FILE_PREFIX};

const DEFAULT_LINES: usize = 50;

/// Prints the tail of the most recent log file.
///
/// # Errors
/// - If the log directory cannot be determined
/// - If log files cannot be read
pub fn handle_logs() -> Result<(), anyhow::Error> {
    let log_dir = log_dir()?;

    if !log_dir.exists() {
        println!("Log directory does not exist yet: {}", log_dir.display());
        println!("Logs will be created when the application runs.");
        return Ok(());
    }

    let Some(log_file) = find_latest_log(&log_dir)? else {
        println!("No log files found in: {}", log_dir.display());
        println!("Run 'sound-displayer' to generate logs.");
        return Ok(());
    };

    let content =
        fs::read_to_string(&log_file).map_err(|e| anyhow!("Failed to read log file: {e}"))?;

    if content.is_empty() {
        println!("Log file is empty: {}", log_file.display());
        return Ok(());
    }

    let lines: Vec<&str> = content.lines().collect();
    let start_index = lines.len().saturating_sub(DEFAULT_LINES);

    println!();
    if start_index > 0 {
        println!("Showing last {} of {} lines:", DEFAULT_LINES, lines.len());
    } else {
        println!("Showing all {} lines:", lines.len());
    }
    println!("Full log file at: {}", log_file.display());
    println!();

    for line in &lines[start_index..] {
        println!("{line}");
    }

    Ok(())
}

/// Finds the most recently modified log file in the directory.
fn find_latest_log(log_dir: &Path) -> Result<Option<PathBuf>, anyhow::Error> {
    let entries =
        fs::read_dir(log_dir).map_err(|e| anyhow!("Failed to read log directory: {e}"))?;

    let mut latest: Option<(PathBuf, std::time::SystemTime)> = None;

    for entry in entries {
        let path = entry
            .map_err(|e| anyhow!("Failed to read directory entry: {e}"))?
            .path();

        if !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        {
            continue;
        }

        let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) else {
            continue;
        };
        if latest.as_ref().map_or(true, |(_, newest)| modified > *newest) {
            latest = Some((path, modified));
        }
    }

    Ok(latest.map(|(path, _)| path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_latest_log_ignores_other_files() {
        let dir = std::env::temp_dir().join(format!("sound_displayer_latest_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        fs::write(dir.join(format!("{LOG_FILE_PREFIX}.2026-10-18")), "old").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dir.join(format!("{LOG_FILE_PREFIX}.2026-10-19")), "new").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        fs::write(dir.join("notes.txt"), "not a log").unwrap();

        let latest = find_latest_log(&dir).unwrap().unwrap();
        assert!(latest.ends_with(format!("{LOG_FILE_PREFIX}.2026-10-19")));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_find_latest_log_in_empty_dir() {
        let dir = std::env::temp_dir().join(format!("sound_displayer_empty_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        assert!(find_latest_log(&dir).unwrap().is_none());
        fs::remove_dir_all(&dir).ok();
    }
}
