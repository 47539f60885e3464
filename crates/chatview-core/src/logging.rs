//! Tracing subscriber setup.
//!
//! Interactive mode logs to a file so the alternate screen is not
//! corrupted; one-shot commands log to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LOG_ENV, paths};

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Appends to `dir/file_name`.
    File { dir: PathBuf, file_name: String },
}

impl LogTarget {
    /// File target under `$CHATVIEW_HOME/logs`.
    pub fn interactive(config: &Config) -> Self {
        LogTarget::File {
            dir: paths::logs_dir(),
            file_name: config.log_file_name().to_string(),
        }
    }
}

/// Keeps the non-blocking writer flushing until dropped.
#[must_use = "dropping the guard stops log flushing"]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Builds the filter: `CHATVIEW_LOG` wins over the configured level.
pub fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
pub fn init(config: &Config, target: LogTarget) -> Result<LogGuard> {
    let filter = env_filter(&config.log.level);

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))?;
            Ok(LogGuard { _worker: None })
        }
        LogTarget::File { dir, file_name } => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(&dir, &file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))?;
            Ok(LogGuard {
                _worker: Some(guard),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_falls_back_on_bad_directive() {
        // An unparsable level must not abort startup.
        let filter = env_filter("not[a=valid");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_interactive_target_uses_configured_file() {
        let mut config = Config::default();
        config.log.file = Some("session.log".to_string());
        let LogTarget::File { file_name, dir } = LogTarget::interactive(&config) else {
            panic!("expected file target");
        };
        assert_eq!(file_name, "session.log");
        assert!(dir.ends_with("logs"));
    }
}
