use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum size per log file before rotation (~5 MB)
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Number of rotated log files to keep
const MAX_LOG_FILES: usize = 5;

const LOG_FILE_NAME: &str = "ratesync.log";

/// macOS convention: ~/Library/Logs/<AppName>/
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("Library/Logs/RateSync")
}

/// Installs the global logger: colored console output on stderr and a
/// persistent, rotated log file. Returns the log file path, if any.
pub fn setup_logging(
    console_level: LevelFilter,
    log_file: Option<PathBuf>,
    file_level: LevelFilter,
) -> Result<Option<PathBuf>> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .level(console_level)
        .format(move |out, message, record| {
            out.finish(format_args!("[{}] {}", colors.color(record.level()), message))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level_for("lofty", LevelFilter::Warn)
        .chain(console);

    let path = if file_level == LevelFilter::Off {
        None
    } else {
        let path = log_file.unwrap_or_else(|| default_log_dir().join(LOG_FILE_NAME));
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        }
        rotate_if_needed(&path, MAX_LOG_FILE_SIZE, MAX_LOG_FILES);

        let file = fern::log_file(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(file_level)
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "[{}] [{}] {}",
                        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.level(),
                        message
                    ))
                })
                .chain(file),
        );
        Some(path)
    };

    dispatch.apply().context("Failed to install logger")?;

    log::info!(
        "=== RateSync session started at {} ===",
        Local::now().format("%Y-%m-%d %H:%M:%S %Z")
    );
    Ok(path)
}

/// Rotate log files: ratesync.log → ratesync.1.log → ratesync.2.log → …
fn rotate_if_needed(current: &Path, max_size: u64, max_files: usize) {
    let file_size = fs::metadata(current).map(|m| m.len()).unwrap_or(0);
    if file_size < max_size {
        return;
    }

    // Shift existing rotated files
    for i in (1..max_files).rev() {
        let _ = fs::rename(rotated_path(current, i), rotated_path(current, i + 1));
    }
    let _ = fs::rename(current, rotated_path(current, 1));
}

fn rotated_path(current: &Path, index: usize) -> PathBuf {
    let stem = current
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("ratesync");
    let ext = current
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("log");
    current.with_file_name(format!("{stem}.{index}.{ext}"))
}
