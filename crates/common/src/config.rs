//! Suite configuration for the CloudX environment tests.
//!
//! Configuration is read once from a JSON file (`appsettings.json` by
//! convention), then environment variables are layered on top. Everything is
//! validated eagerly so that a bad setting fails at startup instead of in the
//! middle of a test run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`SuiteConfig::region`].
pub const ENV_REGION: &str = "CLOUDX_REGION";
/// Fallback region variable used by the AWS tooling.
pub const ENV_AWS_REGION: &str = "AWS_REGION";
/// Environment variable overriding [`LoggingConfig::level`].
pub const ENV_LOG_LEVEL: &str = "CLOUDX_LOG_LEVEL";
/// Environment variable overriding [`LoggingConfig::json`].
pub const ENV_LOG_JSON: &str = "CLOUDX_LOG_JSON";
/// Environment variable overriding [`PollingConfig::interval_ms`].
pub const ENV_POLL_INTERVAL_MS: &str = "CLOUDX_POLL_INTERVAL_MS";
/// Environment variable overriding [`PollingConfig::timeout_ms`].
pub const ENV_POLL_TIMEOUT_MS: &str = "CLOUDX_POLL_TIMEOUT_MS";
/// Environment variable overriding [`SuiteConfig::fixtures_dir`].
pub const ENV_FIXTURES_DIR: &str = "CLOUDX_FIXTURES_DIR";

const DEFAULT_FIXTURES_DIR: &str = "TestData";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Can't load config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {var}: {message}")]
    InvalidEnvVar { var: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level suite configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// AWS region the environment under test is deployed to
    pub region: String,
    /// Directory holding the expected-value JSON fixtures
    #[serde(default = "default_fixtures_dir")]
    pub fixtures_dir: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON-formatted log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Default polling window for eventual-consistency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            timeout_ms: 60_000,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_fixtures_dir() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURES_DIR)
}

impl SuiteConfig {
    /// Load configuration from a JSON file and apply process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, an
    /// override is malformed, or the merged configuration is invalid.
    pub fn from_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file(path)?.with_overrides(&env::vars().collect())
    }

    /// Load configuration from a JSON file without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&raw)
    }

    /// Parse and validate configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed JSON or invalid values.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: SuiteConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable map (for testing, or `env::vars()`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an override cannot be parsed or the
    /// resulting configuration fails validation.
    pub fn with_overrides(mut self, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        if let Some(region) = vars.get(ENV_REGION).or_else(|| vars.get(ENV_AWS_REGION)) {
            self.region.clone_from(region);
        }

        if let Some(level) = vars.get(ENV_LOG_LEVEL) {
            self.logging.level.clone_from(level);
        }

        if let Some(json) = vars.get(ENV_LOG_JSON) {
            self.logging.json = parse_bool(ENV_LOG_JSON, json)?;
        }

        if let Some(interval) = vars.get(ENV_POLL_INTERVAL_MS) {
            self.polling.interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, interval)?;
        }

        if let Some(timeout) = vars.get(ENV_POLL_TIMEOUT_MS) {
            self.polling.timeout_ms = parse_millis(ENV_POLL_TIMEOUT_MS, timeout)?;
        }

        if let Some(dir) = vars.get(ENV_FIXTURES_DIR) {
            self.fixtures_dir = PathBuf::from(dir);
        }

        self.validate()?;

        tracing::debug!(
            region = %self.region,
            log_level = %self.logging.level,
            poll_interval_ms = self.polling.interval_ms,
            poll_timeout_ms = self.polling.timeout_ms,
            "Suite configuration resolved"
        );

        Ok(self)
    }

    /// Check invariants that every consumer relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region must not be empty".to_string()));
        }

        if self.polling.interval_ms == 0 || self.polling.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "polling interval and timeout must be greater than zero".to_string(),
            ));
        }

        if self.polling.interval_ms > self.polling.timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "polling interval ({}ms) exceeds timeout ({}ms)",
                self.polling.interval_ms, self.polling.timeout_ms
            )));
        }

        Ok(())
    }

    /// Resolve a fixture file name against [`SuiteConfig::fixtures_dir`].
    #[must_use]
    pub fn fixture_path(&self, file_name: &str) -> PathBuf {
        self.fixtures_dir.join(file_name)
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_millis(var: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            message: e.to_string(),
        })
}
