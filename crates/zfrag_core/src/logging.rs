//! Logging bootstrap.
//!
//! # Responsibility
//! - Initialize rolling file logs exactly once per process.
//! - Keep runtime log lines greppable (`event=... module=...`).
//!
//! # Invariants
//! - Re-initialization with the same configuration is idempotent.
//! - Re-initialization with a conflicting configuration is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "zfrag";
const LOG_ROTATE_BYTES: u64 = 5 * 1024 * 1024;
const LOG_KEEP_FILES: usize = 3;

static ACTIVE: OnceCell<ActiveLogging> = OnceCell::new();

struct ActiveLogging {
    level: &'static str,
    directory: PathBuf,
    _handle: LoggerHandle,
}

/// Initializes file logging at `level` into `directory`.
///
/// # Errors
/// - Unsupported level string.
/// - Directory cannot be created.
/// - Logging already active with a different level or directory.
pub fn init_logging(level: &str, directory: &str) -> Result<(), String> {
    let level = canonical_level(level)?;
    let directory = Path::new(directory.trim());
    if directory.as_os_str().is_empty() {
        return Err("log directory must not be empty".to_string());
    }
    let directory = directory.to_path_buf();

    let state = ACTIVE.get_or_try_init(|| -> Result<ActiveLogging, String> {
        std::fs::create_dir_all(&directory).map_err(|err| {
            format!(
                "failed to create log directory `{}`: {err}",
                directory.display()
            )
        })?;

        let handle = Logger::try_with_str(level)
            .map_err(|err| format!("invalid log level `{level}`: {err}"))?
            .log_to_file(
                FileSpec::default()
                    .directory(&directory)
                    .basename(LOG_BASENAME),
            )
            .rotate(
                Criterion::Size(LOG_ROTATE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(LOG_KEEP_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .format_for_files(flexi_logger::detailed_format)
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;

        info!(
            "event=logging_started module=core level={level} dir={} version={}",
            directory.display(),
            env!("CARGO_PKG_VERSION")
        );

        Ok(ActiveLogging {
            level,
            directory: directory.clone(),
            _handle: handle,
        })
    })?;

    if state.level != level {
        return Err(format!(
            "logging already active at level `{}`; refusing to switch to `{level}`",
            state.level
        ));
    }
    if state.directory != directory {
        return Err(format!(
            "logging already active in `{}`; refusing to switch to `{}`",
            state.directory.display(),
            directory.display()
        ));
    }
    Ok(())
}

/// Active `(level, directory)` pair, or `None` before initialization.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|state| (state.level, state.directory.clone()))
}

/// Default level for the current build mode.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn canonical_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{canonical_level, default_log_level, init_logging, logging_status};

    #[test]
    fn canonical_level_normalizes_known_values() {
        assert_eq!(canonical_level("INFO").expect("level"), "info");
        assert_eq!(canonical_level(" warning ").expect("level"), "warn");
        assert!(canonical_level("loud").is_err());
    }

    #[test]
    fn default_level_matches_build_mode() {
        let level = default_log_level();
        assert!(level == "debug" || level == "info");
    }

    #[test]
    fn init_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().expect("temp dir");
        let dir_str = dir
            .path()
            .to_str()
            .expect("utf-8 temp path")
            .to_string();

        init_logging("info", &dir_str).expect("first init");
        init_logging("info", &dir_str).expect("same config is idempotent");

        let level_conflict =
            init_logging("debug", &dir_str).expect_err("level conflict must fail");
        assert!(level_conflict.contains("refusing to switch"));

        let other_dir = tempfile::tempdir().expect("second temp dir");
        let dir_conflict = init_logging(
            "info",
            other_dir.path().to_str().expect("utf-8 temp path"),
        )
        .expect_err("directory conflict must fail");
        assert!(dir_conflict.contains("refusing to switch"));

        let (level, directory) = logging_status().expect("active logging");
        assert_eq!(level, "info");
        assert_eq!(directory, dir.path());
    }

    #[test]
    fn rejects_empty_directory() {
        assert!(init_logging("info", "  ").is_err());
    }
}
