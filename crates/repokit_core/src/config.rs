//! Store configuration.
//!
//! # Responsibility
//! - Describe connection and logging settings as plain serde structs.
//! - Read overrides from `REPOKIT_*` environment variables with defaults.
//!
//! # Invariants
//! - Every field has a default; an empty environment yields a usable config.
//! - Malformed values are rejected, never silently replaced.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::default_log_level;

pub const ENV_DB_PATH: &str = "REPOKIT_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "REPOKIT_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "REPOKIT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "REPOKIT_LOG_DIR";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl DatabaseConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling log files; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl StoreConfig {
    /// Builds a config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = non_empty(ENV_DB_PATH) {
            config.database.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = non_empty(ENV_BUSY_TIMEOUT_MS) {
            config.database.busy_timeout_ms =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_BUSY_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            config.logging.level = level.trim().to_string();
        }
        if let Some(dir) = non_empty(ENV_LOG_DIR) {
            config.logging.log_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}
