//! Configuration management for chatview.
//!
//! Loads configuration from ${CHATVIEW_HOME}/config.toml with sensible defaults.
//! Precedence for the connection settings: CLI flag > env var > file > default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const BASE_URL_ENV: &str = "CHATVIEW_BASE_URL";
pub const IDENTITY_ENV: &str = "CHATVIEW_IDENTITY";
pub const LOG_ENV: &str = "CHATVIEW_LOG";

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for chatview files.
    //!
    //! Priority order:
    //! 1. CHATVIEW_HOME environment variable
    //! 2. ~/.config/chatview (default)

    use std::path::PathBuf;

    /// Returns the chatview home directory.
    ///
    /// Falls back to a relative `.chatview` when no home directory exists.
    pub fn chatview_home() -> PathBuf {
        if let Ok(home) = std::env::var("CHATVIEW_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".chatview"),
            |h| h.join(".config").join("chatview"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        chatview_home().join("config.toml")
    }

    /// Returns the directory for interactive-mode log files.
    pub fn logs_dir() -> PathBuf {
        chatview_home().join("logs")
    }
}

/// Content rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Width of chart bars, in terminal cells.
    pub chart_width: usize,
    /// Evaluation step budget for generated components.
    pub max_eval_steps: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chart_width: 40,
            max_eval_steps: 100_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `CHATVIEW_LOG` is unset.
    pub level: String,
    /// Log file name for interactive mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub identity: String,
    /// Per-request timeout; 0 disables.
    pub request_timeout_secs: u64,
    pub render: RenderConfig,
    pub log: LogConfig,
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    pub const DEFAULT_IDENTITY: &str = "1";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
    const DEFAULT_LOG_FILE: &str = "chatview.log";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Applies `CHATVIEW_BASE_URL` / `CHATVIEW_IDENTITY` when set.
    pub fn with_env_overrides(self) -> Result<Self> {
        let base_url = non_empty_env(BASE_URL_ENV);
        let identity = non_empty_env(IDENTITY_ENV);
        self.with_overrides(base_url.as_deref(), identity.as_deref())
    }

    /// Applies explicit overrides and validates the result.
    pub fn with_overrides(
        mut self,
        base_url: Option<&str>,
        identity: Option<&str>,
    ) -> Result<Self> {
        if let Some(url) = base_url.map(str::trim).filter(|s| !s.is_empty()) {
            self.base_url = url.to_string();
        }
        if let Some(id) = identity.map(str::trim).filter(|s| !s.is_empty()) {
            self.identity = id.to_string();
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks the connection settings.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(self.base_url.trim())
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            anyhow::bail!("Base URL must be an http(s) URL: {}", self.base_url);
        }
        if self.identity.trim().is_empty() {
            anyhow::bail!("identity must not be empty");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.request_timeout_secs))
        }
    }

    /// Log file name for interactive mode.
    pub fn log_file_name(&self) -> &str {
        self.log
            .file
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(Self::DEFAULT_LOG_FILE)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            identity: Self::DEFAULT_IDENTITY.to_string(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            render: RenderConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
