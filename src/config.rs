//! Configuration loading
//!
//! Reads a TOML file into [`Config`]. Every field has a default, so an empty
//! file (or no file at all) yields a usable configuration.

use crate::error::{Result, StoreError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `database.path`
pub const DB_PATH_ENV: &str = "TICKSTORE_DB_PATH";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// SQLite journal mode applied to every connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Truncate,
}

impl JournalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
        }
    }
}

/// Database section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite file
    pub path: PathBuf,
    /// How long a connection waits for a lock before giving up
    pub busy_timeout_secs: u64,
    pub journal_mode: JournalMode,
    /// When present, connections come from an r2d2 pool instead of being opened per call
    pub pool: Option<PoolConfig>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tickstore.db"),
            busy_timeout_secs: 10,
            journal_mode: JournalMode::default(),
            pool: None,
        }
    }
}

impl DatabaseConfig {
    /// Config for a database file with all other settings defaulted
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

/// Connection pool section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_size: u32,
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            connection_timeout_secs: 10,
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Directory for the rolling log file. Console only when unset.
    pub directory: Option<PathBuf>,
    pub file_name: String,
    /// Number of daily files kept
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_name: "tickstore.log".to_string(),
            max_files: 7,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Reading config from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load `path` if given, otherwise defaults; then apply env overrides
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        if let Ok(db_path) = std::env::var(DB_PATH_ENV) {
            if !db_path.is_empty() {
                config.database.path = PathBuf::from(db_path);
            }
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(StoreError::Config("database.path must not be empty".to_string()));
        }
        if let Some(pool) = &self.database.pool {
            if pool.max_size == 0 {
                return Err(StoreError::Config("database.pool.max_size must be at least 1".to_string()));
            }
        }
        if self.logging.max_files == 0 {
            return Err(StoreError::Config("logging.max_files must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("tickstore.db"));
        assert_eq!(config.database.busy_timeout(), Duration::from_secs(10));
        assert_eq!(config.database.journal_mode, JournalMode::Wal);
        assert!(config.database.pool.is_none());
        assert_eq!(config.logging.max_files, 7);
    }

    #[test]
    fn test_parse_full_config() {
        let text = r#"
            [database]
            path = "/var/lib/tickstore/market.db"
            busy_timeout_secs = 3
            journal_mode = "delete"

            [database.pool]
            max_size = 2

            [logging]
            level = "debug"
            directory = "logs"
        "#;
        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(config.database.busy_timeout_secs, 3);
        assert_eq!(config.database.journal_mode.as_str(), "DELETE");
        let pool = config.database.pool.unwrap();
        assert_eq!(pool.max_size, 2);
        assert_eq!(pool.connection_timeout_secs, 10);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.directory, Some(PathBuf::from("logs")));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let err = Config::from_toml_str("[database.pool]\nmax_size = 0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = Config::from_toml_str("[database\npath = 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
