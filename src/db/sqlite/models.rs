//! SQLite data models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Queue kinds, each backed by its own physical table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    /// Transient messages
    Msg,
    /// Check flags
    Check,
}

impl QueueKind {
    pub const ALL: [QueueKind; 2] = [QueueKind::Msg, QueueKind::Check];

    /// Physical table backing this queue
    pub fn table_name(&self) -> &'static str {
        match self {
            QueueKind::Msg => "table_msg",
            QueueKind::Check => "table_check",
        }
    }
}

/// Mutable columns of a `common_data` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFields {
    pub value1: Option<String>,
    pub value2: Option<String>,
    pub value3: Option<String>,
    pub value4: Option<String>,
    pub number1: Option<f64>,
    pub number2: Option<f64>,
    pub number3: Option<f64>,
    pub number4: Option<f64>,
    /// Stored at second precision
    pub date: NaiveDateTime,
}

impl RecordFields {
    /// Fields with only a date set
    pub fn dated(date: NaiveDateTime) -> Self {
        Self {
            value1: None,
            value2: None,
            value3: None,
            value4: None,
            number1: None,
            number2: None,
            number3: None,
            number4: None,
            date,
        }
    }
}

/// Row of the shared tagged time-series table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: RecordFields,
}

/// One OHLCV sample as supplied by a market-data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Traded value (price × volume)
    pub value: f64,
}

/// Stored OHLCV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvPoint {
    pub ticker: String,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub value: f64,
    /// Percent change of `close` against the previous bar of the batch it was written in
    pub price_change: Option<f64>,
}
