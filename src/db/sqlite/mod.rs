//! SQLite store
//!
//! [`SqliteStore`] exposes one method per logical operation. Each call acquires
//! its own connection through the configured [`ConnectionSource`], runs inside a
//! single transaction and releases the connection before returning.

pub mod connection;
pub mod models;
pub mod ohlcv;
pub mod queue;
pub mod records;
pub mod schema;
pub mod transaction;

use crate::config::DatabaseConfig;
use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
pub use connection::{ConnectionSource, Connector, FileConnector, PooledConnector, StoreConnection};
pub use models::{OhlcvBar, OhlcvPoint, QueueKind, Record, RecordFields};
pub use transaction::TransactionalUnit;

/// SQLite store over a single database file
pub struct SqliteStore<S = Connector> {
    unit: TransactionalUnit<S>,
}

impl SqliteStore<Connector> {
    /// Open a store as described by `config`. No connection is held afterwards.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let connector = Connector::from_config(config)?;
        tracing::info!("SQLite store at {:?}", config.path);
        Ok(Self::with_source(connector))
    }
}

impl<S: ConnectionSource> SqliteStore<S> {
    /// Build a store around any connection source
    pub fn with_source(source: S) -> Self {
        Self {
            unit: TransactionalUnit::new(source),
        }
    }

    // ========== Queue Methods ==========

    /// Append `text` to the `kind` queue
    pub fn append(&self, kind: QueueKind, text: &str) -> Result<()> {
        self.unit.write("queue.append", |tx| queue::append(tx, kind, text))
    }

    /// Atomically take every queued entry, oldest first
    pub fn drain(&self, kind: QueueKind) -> Result<Vec<String>> {
        self.unit.write("queue.drain", |tx| queue::drain(tx, kind))
    }

    /// Count entries waiting in the `kind` queue
    pub fn pending(&self, kind: QueueKind) -> Result<usize> {
        self.unit.read("queue.pending", |tx| queue::pending(tx, kind))
    }

    // ========== Record Methods ==========

    /// Insert a record of type `kind`, returning its id
    pub fn insert_record(&self, kind: &str, fields: &RecordFields) -> Result<i64> {
        self.unit.write("records.insert", |tx| records::insert(tx, kind, fields))
    }

    pub fn get_record(&self, id: i64) -> Result<Option<Record>> {
        self.unit.read("records.get_by_id", |tx| records::get_by_id(tx, id))
    }

    /// Records of type `kind` dated on calendar day `day`
    pub fn get_records_by_date(&self, kind: &str, day: NaiveDate) -> Result<Vec<Record>> {
        self.unit.read("records.get_by_date", |tx| records::get_by_date(tx, kind, day))
    }

    /// Records of type `kind` dated within `[start, end]`
    pub fn get_records_between(
        &self,
        kind: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Record>> {
        self.unit.read("records.get_by_date_range", |tx| {
            records::get_by_date_range(tx, kind, start, end)
        })
    }

    /// Replace the mutable fields of record `id`; `Ok(0)` when it does not exist
    pub fn update_record(&self, id: i64, fields: &RecordFields) -> Result<usize> {
        self.unit.write("records.update_by_id", |tx| records::update_by_id(tx, id, fields))
    }

    pub fn delete_record(&self, id: i64) -> Result<usize> {
        self.unit.write("records.delete_by_id", |tx| records::delete_by_id(tx, id))
    }

    /// Delete records dated more than `days` days ago (UTC)
    pub fn purge_records_older_than(&self, days: u32) -> Result<usize> {
        // cutoff is fixed before the write lock is taken
        let cutoff = records::retention_cutoff(days);
        self.purge_records_before(cutoff)
    }

    /// Delete records dated strictly before `cutoff`
    pub fn purge_records_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        self.unit.write("records.purge", |tx| records::purge_before(tx, cutoff))
    }

    // ========== OHLCV Methods ==========

    /// Insert or replace a batch of bars for `ticker`
    pub fn upsert_ohlcv(&self, ticker: &str, bars: &[OhlcvBar]) -> Result<usize> {
        self.unit.write("ohlcv.upsert_batch", |tx| ohlcv::upsert_batch(tx, ticker, bars))
    }

    pub fn delete_ohlcv_ticker(&self, ticker: &str) -> Result<usize> {
        self.unit.write("ohlcv.delete_by_ticker", |tx| ohlcv::delete_by_ticker(tx, ticker))
    }

    /// Bars of `ticker` within `[start, end]`, oldest first
    pub fn query_ohlcv(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<OhlcvPoint>> {
        self.unit.read("ohlcv.query_range", |tx| ohlcv::query_range(tx, ticker, start, end))
    }

    /// Latest stored timestamp for `ticker`, `None` when it has no rows
    pub fn latest_ohlcv_timestamp(&self, ticker: &str) -> Result<Option<NaiveDateTime>> {
        self.unit.read("ohlcv.latest_timestamp", |tx| ohlcv::latest_timestamp(tx, ticker))
    }

    /// Delete bars older than `years` × 365 days (UTC)
    pub fn purge_ohlcv_older_than_years(&self, years: u32) -> Result<usize> {
        let cutoff = ohlcv::retention_cutoff(years);
        self.purge_ohlcv_before(cutoff)
    }

    pub fn purge_ohlcv_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        self.unit.write("ohlcv.purge", |tx| ohlcv::purge_before(tx, cutoff))
    }
}
