//! Table definitions
//!
//! Tables are created lazily by the operation that first touches them; there is
//! no migration step. Re-running against an older file only adds missing tables.

use super::models::QueueKind;
use crate::error::{Result, StoreError};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use rusqlite::Connection;

/// Shared tagged time-series table
pub const RECORDS_TABLE: &str = "common_data";

/// OHLCV table, keyed by (ticker, timestamp)
pub const OHLCV_TABLE: &str = "ohlcv_data";

/// Textual timestamp format. Lexicographic order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Years whose rendering is exactly four digits; outside them text order breaks
pub const MIN_STORABLE_YEAR: i32 = 0;
pub const MAX_STORABLE_YEAR: i32 = 9999;

// Sort before and after every stored timestamp
const BEFORE_ALL: &str = "0000-00-00 00:00:00";
const AFTER_ALL: &str = "9999-99-99 99:99:99";

const CREATE_MSG_QUEUE: &str = r#"
CREATE TABLE IF NOT EXISTS table_msg (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text_value TEXT NOT NULL
);
"#;

const CREATE_CHECK_QUEUE: &str = r#"
CREATE TABLE IF NOT EXISTS table_check (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text_value TEXT NOT NULL
);
"#;

const CREATE_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS common_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    value1 TEXT,
    value2 TEXT,
    value3 TEXT,
    value4 TEXT,
    number1 REAL,
    number2 REAL,
    number3 REAL,
    number4 REAL,
    date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_common_data_type_date ON common_data(type, date);
"#;

const CREATE_OHLCV: &str = r#"
CREATE TABLE IF NOT EXISTS ohlcv_data (
    ticker TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume REAL NOT NULL,
    value REAL NOT NULL,
    price_change REAL,
    PRIMARY KEY (ticker, timestamp)
);

CREATE INDEX IF NOT EXISTS idx_ohlcv_data_timestamp ON ohlcv_data(timestamp);
"#;

pub fn ensure_queue_table(conn: &Connection, kind: QueueKind) -> rusqlite::Result<()> {
    let ddl = match kind {
        QueueKind::Msg => CREATE_MSG_QUEUE,
        QueueKind::Check => CREATE_CHECK_QUEUE,
    };
    conn.execute_batch(ddl)
}

pub fn ensure_records_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_RECORDS)
}

pub fn ensure_ohlcv_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_OHLCV)
}

/// Render a timestamp in the stored format (sub-second part dropped)
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Reject timestamps that would not sort correctly once rendered
pub fn check_storable(ts: &NaiveDateTime) -> Result<()> {
    if (MIN_STORABLE_YEAR..=MAX_STORABLE_YEAR).contains(&ts.year()) {
        Ok(())
    } else {
        Err(StoreError::TimestampOutOfRange(*ts))
    }
}

fn clamped(ts: &NaiveDateTime) -> String {
    match ts.year() {
        y if y < MIN_STORABLE_YEAR => BEFORE_ALL.to_string(),
        y if y > MAX_STORABLE_YEAR => AFTER_ALL.to_string(),
        _ => format_timestamp(ts),
    }
}

/// Comparison text for `column <= ts`.
///
/// Stored values have whole seconds, so truncating `ts` keeps the comparison exact.
pub fn floor_bound(ts: &NaiveDateTime) -> String {
    clamped(ts)
}

/// Comparison text for `column >= ts` and `column < ts`.
///
/// A fractional `ts` is rounded up to the next whole second.
pub fn ceil_bound(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        return clamped(ts);
    }
    match ts
        .with_nanosecond(0)
        .and_then(|whole| whole.checked_add_signed(Duration::seconds(1)))
    {
        Some(next) => clamped(&next),
        None => AFTER_ALL.to_string(),
    }
}

/// Now (UTC) minus `days`, saturating at the earliest representable time
pub fn days_before_now(days: i64) -> NaiveDateTime {
    Duration::try_days(days)
        .and_then(|age| Utc::now().naive_utc().checked_sub_signed(age))
        .unwrap_or(NaiveDateTime::MIN)
}
