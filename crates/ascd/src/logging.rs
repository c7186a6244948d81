//! Tracing subscriber setup for the `asc` binary.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ASC_LOG";
/// Lives next to the agent logs; `asc` is a reserved agent name for this reason.
pub const LOG_FILE_NAME: &str = "asc.log";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open log file in {path}: {source}")]
    Appender {
        path: PathBuf,
        #[source]
        source: tracing_appender::rolling::InitError,
    },
    #[error("failed to install tracing subscriber: {message}")]
    Install { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// The terminal belongs to the dashboard, so logs go to a file.
    File { dir: PathBuf },
}

/// `ASC_LOG` wins over `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global subscriber. The returned guard must be held until exit
/// when logging to a file, otherwise buffered lines are lost.
pub fn init_logging(
    target: &LogTarget,
    default_filter: &str,
) -> Result<Option<WorkerGuard>, LoggingError> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(default_filter))
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .try_init()
                .map_err(|e| LoggingError::Install {
                    message: e.to_string(),
                })?;
            Ok(None)
        }
        LogTarget::File { dir } => {
            let appender = file_appender(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(default_filter))
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| LoggingError::Install {
                    message: e.to_string(),
                })?;
            Ok(Some(guard))
        }
    }
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(dir)
        .map_err(|source| LoggingError::Appender {
            path: dir.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_appender_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logs = dir.path().join("nested").join("logs");
        let _appender = file_appender(&logs).expect("appender");
        assert!(logs.is_dir());
    }

    #[test]
    fn daemon_log_cannot_collide_with_an_agent_log() {
        use asc_core::validation::{DAEMON_PROCESS_NAME, RESERVED_AGENT_NAMES};

        assert_eq!(LOG_FILE_NAME, format!("{DAEMON_PROCESS_NAME}.log"));
        assert!(RESERVED_AGENT_NAMES.contains(&DAEMON_PROCESS_NAME));
    }

    #[test]
    fn default_filter_applies_without_env() {
        let filter = env_filter("warn");
        assert!(!filter.to_string().is_empty());
    }
}
