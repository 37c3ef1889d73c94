//! tickstore - local SQLite persistence
//!
//! Three access patterns over one database file:
//! drain queues for transient text, a tagged time-series record table,
//! and an OHLCV market series keyed by ticker.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use config::Config;
pub use db::sqlite::{OhlcvBar, OhlcvPoint, QueueKind, Record, RecordFields, SqliteStore};
pub use error::{ErrorKind, Result, StoreError, StoreResultExt};
