//! Store error types

use chrono::NaiveDateTime;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Store-wide error type
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Lock timeout during {operation}: {source}")]
    LockTimeout {
        operation: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Timestamp {0} is outside the storable years 0000-9999")]
    TimestampOutOfRange(NaiveDateTime),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error classification callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Write lock not acquired within the busy timeout
    LockTimeout,
    /// Malformed SQL, constraint violation or type mismatch
    Statement,
    /// Could not open or check out a connection
    Connection,
    /// Rejected before reaching the database
    InvalidInput,
    Config,
    Io,
}

impl StoreError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::LockTimeout { .. } => ErrorKind::LockTimeout,
            StoreError::Database(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::CannotOpen =>
            {
                ErrorKind::Connection
            }
            StoreError::Database(_) => ErrorKind::Statement,
            StoreError::TimestampOutOfRange(_) => ErrorKind::InvalidInput,
            StoreError::Pool(_) => ErrorKind::Connection,
            StoreError::Config(_) | StoreError::ConfigParse(_) => ErrorKind::Config,
            StoreError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_lock_timeout(&self) -> bool {
        self.kind() == ErrorKind::LockTimeout
    }

    /// Re-tag SQLite BUSY/LOCKED failures as lock timeouts for `operation`
    pub(crate) fn classify(self, operation: &str) -> Self {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(err, msg))
                if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                StoreError::LockTimeout {
                    operation: operation.to_string(),
                    source: rusqlite::Error::SqliteFailure(err, msg),
                }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Degrade a failed store call to an empty value.
///
/// Useful for callers that treat "operation failed" the same as "no data".
/// The error is logged at `warn` before it is discarded.
pub trait StoreResultExt<T> {
    fn or_empty(self) -> T;
}

impl<T: Default> StoreResultExt<T> for Result<T> {
    fn or_empty(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), "Store call degraded to empty result: {}", e);
                T::default()
            }
        }
    }
}
