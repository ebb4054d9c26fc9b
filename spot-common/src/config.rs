//! Configuration loading
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Levels 1 and 2 are collected by the binary into [`ConfigOverrides`];
//! this module owns levels 3 and 4. A missing config file is never fatal.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SPOT_CONFIG";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Page size the backend accepts per list call
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;
pub const DEFAULT_RANKING_LIMIT: u32 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FAN_OUT_LIMIT: usize = 16;

const APP_DIR: &str = "urbanspot";

/// Config file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the UrbanSpot backend
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Shared secret sent as `X-API-Key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Records requested per list call
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Entries requested from the global ranking
    #[serde(default = "default_ranking_limit")]
    pub ranking_limit: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Child fetches in flight at once during aggregation
    #[serde(default = "default_fan_out_limit")]
    pub fan_out_limit: usize,

    /// Local state database (persisted current user)
    #[serde(default)]
    pub state_db: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_ranking_limit() -> u32 {
    DEFAULT_RANKING_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_fan_out_limit() -> usize {
    DEFAULT_FAN_OUT_LIMIT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            page_size: DEFAULT_PAGE_SIZE,
            ranking_limit: DEFAULT_RANKING_LIMIT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            fan_out_limit: DEFAULT_FAN_OUT_LIMIT,
            state_db: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Check values before any request is issued
    pub fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(Error::Config("api_url must not be empty".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "page_size {} outside 1..={}",
                self.page_size, MAX_PAGE_SIZE
            )));
        }
        if self.ranking_limit == 0 {
            return Err(Error::Config("ranking_limit must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.fan_out_limit == 0 {
            return Err(Error::Config("fan_out_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// State database path, falling back to the platform default
    pub fn state_db_path(&self) -> PathBuf {
        self.state_db.clone().unwrap_or_else(default_state_db)
    }
}

/// Values collected from the command line and environment
///
/// `None` means "not given", leaving the file or default value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub page_size: Option<u32>,
    pub ranking_limit: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub fan_out_limit: Option<usize>,
    pub state_db: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Layer these overrides on top of `config`
    pub fn apply(self, mut config: TomlConfig) -> TomlConfig {
        if let Some(url) = self.api_url {
            config.api_url = url;
        }
        if let Some(key) = self.api_key {
            config.api_key = Some(key);
        }
        if let Some(size) = self.page_size {
            config.page_size = size;
        }
        if let Some(limit) = self.ranking_limit {
            config.ranking_limit = limit;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(limit) = self.fan_out_limit {
            config.fan_out_limit = limit;
        }
        if let Some(path) = self.state_db {
            config.state_db = Some(path);
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(path) = self.log_file {
            config.logging.file = Some(path);
        }
        config
    }
}

/// Platform config file location (`~/.config/urbanspot/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Platform state database location (`~/.local/share/urbanspot/state.db` on Linux)
pub fn default_state_db() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./urbanspot_data"))
        .join("state.db")
}

/// Pick the config file: explicit argument, then `SPOT_CONFIG`, then platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Load the config file, degrading to defaults when it is absent
///
/// An explicitly requested file (argument or `SPOT_CONFIG`) that does not
/// exist is an error. A missing platform-default file only logs a warning.
/// A file that exists but does not parse is always an error.
pub fn load_toml_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let explicit = cli_arg.is_some()
        || std::env::var(CONFIG_ENV_VAR)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

    let Some(path) = resolve_config_path(cli_arg) else {
        warn!("Could not determine config directory, using default configuration");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        if explicit {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        warn!(
            path = %path.display(),
            "Config file not found, using default configuration"
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config = TomlConfig::from_toml_str(&content)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = TomlConfig::from_toml_str("api_url = \"https://spots.example\"\n").unwrap();
        assert_eq!(config.api_url, "https://spots.example");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.fan_out_limit, DEFAULT_FAN_OUT_LIMIT);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_validate_rejects_page_size_out_of_range() {
        let mut config = TomlConfig::default();
        config.page_size = 0;
        assert!(config.validate().is_err());
        config.page_size = MAX_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
        config.page_size = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_take_priority() {
        let file = TomlConfig {
            api_url: "http://from-file".to_string(),
            page_size: 50,
            ranking_limit: 10,
            request_timeout_secs: 5,
            fan_out_limit: 2,
            ..Default::default()
        };
        let merged = ConfigOverrides {
            api_url: Some("http://from-cli".to_string()),
            log_level: Some("debug".to_string()),
            request_timeout_secs: Some(90),
            fan_out_limit: Some(32),
            log_file: Some(PathBuf::from("/tmp/spot.log")),
            ..Default::default()
        }
        .apply(file);

        assert_eq!(merged.api_url, "http://from-cli");
        assert_eq!(merged.page_size, 50);
        assert_eq!(merged.ranking_limit, 10);
        assert_eq!(merged.request_timeout_secs, 90);
        assert_eq!(merged.fan_out_limit, 32);
        assert_eq!(merged.logging.level, "debug");
        assert_eq!(merged.logging.file, Some(PathBuf::from("/tmp/spot.log")));
    }
}
