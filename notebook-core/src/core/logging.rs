//! Rotating file log for the notebook process.
//!
//! Library code only talks to the `log` facade. The embedding shell calls
//! [`init_logging`] once at start-up; later calls with the same settings are
//! no-ops and calls with different settings are rejected.

use std::path::{Path, PathBuf};

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;

use crate::{NotebookError, Result};

const LOG_FILE_BASENAME: &str = "notebook";
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    dir: PathBuf,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` into `dir`.
///
/// # Errors
///
/// Returns [`NotebookError::InvalidConfig`] for an unknown level, an empty
/// directory, a conflicting re-initialisation or a logger that fails to start,
/// and [`NotebookError::Io`] if `dir` cannot be created.
pub fn init_logging(level: &str, dir: &Path) -> Result<()> {
    let level = normalize_level(level)?;
    if dir.as_os_str().is_empty() {
        return Err(NotebookError::InvalidConfig("log directory is empty".to_string()));
    }

    let active = LOGGER.get_or_try_init(|| -> Result<ActiveLogger> {
        std::fs::create_dir_all(dir)?;
        let handle = Logger::try_with_str(level)
            .map_err(|e| NotebookError::InvalidConfig(format!("log level {level}: {e}")))?
            .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|e| NotebookError::InvalidConfig(format!("failed to start logger: {e}")))?;

        log::info!(
            "Notebook core {} logging at {level} to {}",
            env!("CARGO_PKG_VERSION"),
            dir.display()
        );
        Ok(ActiveLogger {
            level,
            dir: dir.to_path_buf(),
            _handle: handle,
        })
    })?;

    if active.dir != dir || active.level != level {
        return Err(NotebookError::InvalidConfig(format!(
            "logging already initialised at {} ({}), refusing {} ({level})",
            active.dir.display(),
            active.level,
            dir.display()
        )));
    }
    Ok(())
}

/// `(level, dir)` of the running logger, if started.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGER.get().map(|a| (a.level, a.dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// `<platform local data dir>/notebook/logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notebook")
        .join("logs")
}

fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(NotebookError::InvalidConfig(format!(
            "unsupported log level: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(" WARNING ").unwrap(), "warn");
        assert!(normalize_level("loud").is_err());
    }

    #[test]
    fn test_init_is_idempotent_and_rejects_conflicts() {
        let dir = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();

        init_logging("info", dir.path()).unwrap();
        init_logging("info", dir.path()).unwrap();
        assert!(init_logging("debug", dir.path()).is_err());
        assert!(init_logging("info", other.path()).is_err());

        let (level, active_dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(active_dir, dir.path());
    }
}
