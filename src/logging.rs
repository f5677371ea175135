//! Logging setup for the `tabclean` binary.
//!
//! Logs go to stderr (so cleaned CSV can be piped from stdout) and,
//! optionally, to a daily rolling file in the app data directory.
//!
//! ## Usage
//!
//! ```no_run
//! use tabclean::logging;
//!
//! // Initialize once at startup
//! logging::init(true).expect("Failed to initialize logging");
//!
//! tracing::info!("Cleaning started");
//! ```

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/tabclean/logs`
/// - macOS: `~/Library/Application Support/tabclean/logs`
/// - Linux: `~/.local/share/tabclean/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("tabclean").join("logs"))
}

/// Initializes the logging system.
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
/// With `log_to_file`, everything that passes the filter is also written to
/// `tabclean.<date>.log`, rotated daily with 10 files kept.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the file
/// appender fails.
pub fn init(log_to_file: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let file_layer = if log_to_file {
        let log_dir = get_log_dir()?;
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(10)
            .filename_prefix("tabclean")
            .filename_suffix("log")
            .build(&log_dir)
            .context("Failed to create log file appender")?;

        Some(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_ansi(false)
                .with_writer(appender)
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::debug!(log_to_file, "Logging initialized");

    Ok(())
}

/// Gets the path to the current log file
pub fn get_current_log_path() -> Result<PathBuf> {
    let log_dir = get_log_dir()?;
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    Ok(log_dir.join(format!("tabclean.{today}.log")))
}
