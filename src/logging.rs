//! Logging Initialization
//!
//! Tracing setup for the daemon: console output by default, optional daily
//! rolling files when a log directory is configured, `--debug` switches the
//! default filter to debug level.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Logging configuration assembled from CLI flags and environment.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    debug: bool,
    log_dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }
}

/// Default directory for rolling log files: `~/.local/share/wacrab/logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wacrab")
        .join("logs")
}

/// Initialize the global tracing subscriber.
///
/// Returns a guard that must be held for the lifetime of the process when
/// file logging is active; dropping it flushes buffered log lines.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let default_filter = if config.debug {
        "wacrab=debug,info"
    } else {
        "wacrab=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(&dir, "wacrab.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

/// Remove log files older than `days` from the default log directory.
/// Returns the number of files removed.
pub fn cleanup_old_logs(days: u64) -> Result<usize> {
    let dir = default_log_dir();
    if !dir.exists() {
        return Ok(0);
    }

    let cutoff = std::time::SystemTime::now()
        .checked_sub(std::time::Duration::from_secs(days * 24 * 60 * 60))
        .context("Invalid retention window")?;

    let mut removed = 0;
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if modified < cutoff && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}
