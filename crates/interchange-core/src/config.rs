//! Configuration for the rep_interchange pipeline and its store
//!
//! Values come from defaults, an optional TOML file, and `REP_*` environment
//! variables, applied in that order.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::dsl::{DEFAULT_MAX_DEPTH, MAX_SUPPORTED_DEPTH};
use crate::store::VisibilityPolicy;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("IO error reading config file: {message}")]
    IoError { message: String },

    #[error("Configuration parsing error: {message}")]
    ParseError { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterchangeConfig {
    pub parser: ParserConfig,
    pub store: StoreConfig,
    pub visibility: VisibilityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum nesting of forms accepted by the parser.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            other => Err(format!("unknown store backend '{}', expected memory or file", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory holding entry files for the file backend.
    pub path: PathBuf,
    /// Hide new writes for this long, as a replicated store would.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: default_store_path(),
            settle_delay: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        let policy = VisibilityPolicy::default();
        Self {
            poll_interval: policy.poll_interval,
            timeout: policy.timeout,
        }
    }
}

impl VisibilityConfig {
    pub fn policy(&self) -> VisibilityPolicy {
        VisibilityPolicy {
            poll_interval: self.poll_interval,
            timeout: self.timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `<data dir>/rep-interchange/entries`, or a relative path if the platform
/// has no data directory.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rep-interchange")
        .join("entries")
}

impl InterchangeConfig {
    /// An in-memory configuration, used by tests and one-off checks.
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.store.backend = StoreBackend::Memory;
        config
    }

    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// File (if given), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REP_*` overrides using the given variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("REP_STORE_BACKEND") {
            self.store.backend = backend
                .parse()
                .map_err(|reason| invalid("REP_STORE_BACKEND", reason))?;
        }

        if let Some(path) = lookup("REP_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }

        if let Some(delay) = lookup("REP_SETTLE_DELAY") {
            self.store.settle_delay = Some(parse_duration("REP_SETTLE_DELAY", &delay)?);
        }

        if let Some(depth) = lookup("REP_MAX_DEPTH") {
            self.parser.max_depth = depth
                .trim()
                .parse()
                .map_err(|_| invalid("REP_MAX_DEPTH", "Invalid nesting depth"))?;
        }

        if let Some(interval) = lookup("REP_POLL_INTERVAL") {
            self.visibility.poll_interval = parse_duration("REP_POLL_INTERVAL", &interval)?;
        }

        if let Some(timeout) = lookup("REP_VISIBILITY_TIMEOUT") {
            self.visibility.timeout = parse_duration("REP_VISIBILITY_TIMEOUT", &timeout)?;
        }

        if let Some(level) = lookup("REP_LOG_LEVEL") {
            self.logging.level = level.trim().to_ascii_lowercase();
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parser.max_depth == 0 || self.parser.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(invalid(
                "parser.max_depth",
                format!("Must be between 1 and {}", MAX_SUPPORTED_DEPTH),
            ));
        }

        if self.store.backend == StoreBackend::File && self.store.path.as_os_str().is_empty() {
            return Err(invalid(
                "store.path",
                "A directory is required for the file backend",
            ));
        }

        if self.visibility.timeout > Duration::ZERO && self.visibility.poll_interval.is_zero() {
            return Err(invalid(
                "visibility.poll_interval",
                "Must be > 0 when a timeout is set",
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "logging.level",
                format!("Must be one of: {}", valid_levels.join(", ")),
            ));
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| invalid(key, e.to_string()))
}
