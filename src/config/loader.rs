use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/terminal-checkout/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("terminal-checkout").join("config.toml")
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from `path`.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The poll interval is non-zero and fits inside the timeout
    /// - The reader limit is within the processor's accepted range
    /// - A currency is set
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checkout = &self.checkout;

        if checkout.poll_interval_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "poll_interval_seconds must be greater than zero".to_string(),
            });
        }

        if checkout.timeout_seconds < checkout.poll_interval_seconds {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "timeout_seconds ({}) must not be shorter than poll_interval_seconds ({})",
                    checkout.timeout_seconds, checkout.poll_interval_seconds
                ),
            });
        }

        if !(1..=100).contains(&checkout.reader_limit) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "reader_limit must be between 1 and 100, got {}",
                    checkout.reader_limit
                ),
            });
        }

        if checkout.currency.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "currency must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
