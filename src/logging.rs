//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so interactive runs log to a file in the data
//! directory. The filter is read from `LOBBY_LOG`, then `RUST_LOG`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "lobby-tui.log";

fn env_filter(default: &str) -> EnvFilter {
    std::env::var("LOBBY_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Appends `info`-level (by default) logs to `log_path`.
pub fn init_file_logging(log_path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))
}

/// Logs warnings to stderr, for headless commands whose output goes to stdout.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .without_time()
        .try_init()
        .ok();
}

/// Idempotent subscriber for unit tests (captured by the test harness).
#[cfg(test)]
pub(crate) fn init_test_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_test_writer()
        .without_time()
        .try_init()
        .ok();
}
