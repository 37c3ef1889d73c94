//! OHLCV market series
//!
//! Rows are keyed by `(ticker, timestamp)` and written with replace-on-conflict.
//! `price_change` is derived per batch: each bar is compared with the bar before
//! it *in the same batch*, never with rows already stored. Re-upserting a batch
//! that starts mid-history therefore leaves its first row without a change value.

use super::models::{OhlcvBar, OhlcvPoint};
use super::schema::{
    ceil_bound, check_storable, days_before_now, ensure_ohlcv_table, floor_bound, format_timestamp,
};
use crate::error::Result;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

/// Days per year used by age-based retention (no leap-year handling)
pub const DAYS_PER_YEAR: i64 = 365;

/// Percent change of each bar's close against the previous bar.
///
/// The first bar has no predecessor and gets `None`, as does any bar whose
/// predecessor closed at zero.
pub fn price_changes(bars: &[OhlcvBar]) -> Vec<Option<f64>> {
    let mut changes = Vec::with_capacity(bars.len());
    let mut previous: Option<f64> = None;

    for bar in bars {
        let change = previous.and_then(|prev| {
            let pct = (bar.close - prev) / prev * 100.0;
            pct.is_finite().then_some(pct)
        });
        changes.push(change);
        previous = Some(bar.close);
    }

    changes
}

/// Write a batch for `ticker`, replacing rows that share a timestamp.
///
/// The batch is ordered by timestamp before `price_change` is derived.
/// Returns the number of rows written. A bar outside years 0000-9999 rejects
/// the whole batch.
pub fn upsert_batch(conn: &Connection, ticker: &str, bars: &[OhlcvBar]) -> Result<usize> {
    for bar in bars {
        check_storable(&bar.timestamp)?;
    }
    ensure_ohlcv_table(conn)?;
    if bars.is_empty() {
        return Ok(0);
    }

    let mut ordered = bars.to_vec();
    ordered.sort_by_key(|bar| bar.timestamp);
    let changes = price_changes(&ordered);

    let mut stmt = conn.prepare(
        "INSERT OR REPLACE INTO ohlcv_data
             (ticker, timestamp, open, high, low, close, volume, value, price_change)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for (bar, change) in ordered.iter().zip(changes) {
        stmt.execute(params![
            ticker,
            format_timestamp(&bar.timestamp),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            bar.value,
            change,
        ])?;
    }

    tracing::info!("Upserted {} OHLCV rows for {}", ordered.len(), ticker);
    Ok(ordered.len())
}

/// Delete every row of `ticker`
pub fn delete_by_ticker(conn: &Connection, ticker: &str) -> Result<usize> {
    ensure_ohlcv_table(conn)?;

    let rows = conn.execute("DELETE FROM ohlcv_data WHERE ticker = ?1", params![ticker])?;
    tracing::info!("Deleted {} OHLCV rows for {}", rows, ticker);
    Ok(rows)
}

/// Rows of `ticker` with timestamp in `[start, end]`, oldest first.
///
/// Stored timestamps have whole seconds; a fractional `start` excludes its own second.
pub fn query_range(
    conn: &Connection,
    ticker: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<OhlcvPoint>> {
    ensure_ohlcv_table(conn)?;

    let mut stmt = conn.prepare(
        "SELECT ticker, timestamp, open, high, low, close, volume, value, price_change
         FROM ohlcv_data
         WHERE ticker = ?1 AND timestamp >= ?2 AND timestamp <= ?3
         ORDER BY timestamp ASC",
    )?;

    let points = stmt
        .query_map(
            params![ticker, ceil_bound(&start), floor_bound(&end)],
            |row| {
                Ok(OhlcvPoint {
                    ticker: row.get(0)?,
                    timestamp: row.get(1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                    value: row.get(7)?,
                    price_change: row.get(8)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    tracing::debug!("Fetched {} OHLCV rows for {} ({} to {})", points.len(), ticker, start, end);
    Ok(points)
}

/// Most recent stored timestamp for `ticker`
pub fn latest_timestamp(conn: &Connection, ticker: &str) -> Result<Option<NaiveDateTime>> {
    ensure_ohlcv_table(conn)?;

    // MAX() yields one NULL row when the ticker has no data
    let latest: Option<NaiveDateTime> = conn.query_row(
        "SELECT MAX(timestamp) FROM ohlcv_data WHERE ticker = ?1",
        params![ticker],
        |row| row.get(0),
    )?;
    Ok(latest)
}

/// Delete rows of every ticker with timestamp strictly before `cutoff`
pub fn purge_before(conn: &Connection, cutoff: NaiveDateTime) -> Result<usize> {
    ensure_ohlcv_table(conn)?;
    let cutoff = ceil_bound(&cutoff);

    let rows = conn.execute("DELETE FROM ohlcv_data WHERE timestamp < ?1", params![cutoff])?;
    if rows > 0 {
        tracing::info!("Purged {} OHLCV rows older than {}", rows, cutoff);
    }
    Ok(rows)
}

/// Cutoff for a `years`-old retention window, using 365-day years.
///
/// Windows reaching past the earliest representable time purge nothing.
pub fn retention_cutoff(years: u32) -> NaiveDateTime {
    days_before_now(i64::from(years).saturating_mul(DAYS_PER_YEAR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn bar(timestamp: NaiveDateTime, close: f64) -> OhlcvBar {
        OhlcvBar {
            timestamp,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 2.0,
            value: close * 2.0,
        }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("price_change missing");
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_price_changes_within_batch() {
        let bars = [bar(at(1, 0), 100.0), bar(at(1, 1), 110.0), bar(at(1, 2), 99.0)];
        let changes = price_changes(&bars);
        assert_eq!(changes[0], None);
        assert_close(changes[1], 10.0);
        assert_close(changes[2], -10.0);
    }

    #[test]
    fn test_price_change_after_zero_close_is_none() {
        let bars = [bar(at(1, 0), 0.0), bar(at(1, 1), 5.0)];
        assert_eq!(price_changes(&bars), vec![None, None]);
    }

    #[test]
    fn test_upsert_stores_derived_changes() {
        let conn = Connection::open_in_memory().unwrap();
        let bars = [bar(at(1, 0), 100.0), bar(at(1, 1), 110.0), bar(at(1, 2), 99.0)];
        assert_eq!(upsert_batch(&conn, "KRW-BTC", &bars).unwrap(), 3);

        let points = query_range(&conn, "KRW-BTC", at(1, 0), at(1, 2)).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].price_change, None);
        assert_close(points[1].price_change, 10.0);
        assert_close(points[2].price_change, -10.0);
        assert_eq!(points[2].high, 100.0);
        assert_eq!(points[2].value, 198.0);
    }

    #[test]
    fn test_upsert_orders_batch_by_timestamp() {
        let conn = Connection::open_in_memory().unwrap();
        let bars = [bar(at(1, 2), 99.0), bar(at(1, 0), 100.0), bar(at(1, 1), 110.0)];
        upsert_batch(&conn, "KRW-BTC", &bars).unwrap();

        let points = query_range(&conn, "KRW-BTC", at(1, 0), at(1, 2)).unwrap();
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![100.0, 110.0, 99.0]);
        assert_eq!(points[0].price_change, None);
        assert_close(points[2].price_change, -10.0);
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let conn = Connection::open_in_memory().unwrap();
        upsert_batch(&conn, "KRW-ETH", &[bar(at(2, 0), 10.0), bar(at(2, 1), 20.0)]).unwrap();
        upsert_batch(&conn, "KRW-ETH", &[bar(at(2, 1), 30.0)]).unwrap();

        let points = query_range(&conn, "KRW-ETH", at(2, 1), at(2, 1)).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].close, 30.0);
        // single-row batch has no predecessor, stored history is not consulted
        assert_eq!(points[0].price_change, None);
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(upsert_batch(&conn, "KRW-BTC", &[]).unwrap(), 0);
        assert_eq!(latest_timestamp(&conn, "KRW-BTC").unwrap(), None);
    }

    #[test]
    fn test_query_range_filters_ticker_and_bounds() {
        let conn = Connection::open_in_memory().unwrap();
        upsert_batch(&conn, "KRW-BTC", &[bar(at(1, 0), 1.0), bar(at(2, 0), 2.0), bar(at(3, 0), 3.0)]).unwrap();
        upsert_batch(&conn, "KRW-XRP", &[bar(at(2, 0), 9.0)]).unwrap();

        let points = query_range(&conn, "KRW-BTC", at(2, 0), at(3, 0)).unwrap();
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![2.0, 3.0]);
        assert!(points.iter().all(|p| p.ticker == "KRW-BTC"));
    }

    #[test]
    fn test_latest_timestamp() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(latest_timestamp(&conn, "KRW-BTC").unwrap(), None);

        upsert_batch(&conn, "KRW-BTC", &[bar(at(1, 0), 1.0), bar(at(5, 3), 2.0)]).unwrap();
        upsert_batch(&conn, "KRW-XRP", &[bar(at(9, 0), 1.0)]).unwrap();
        assert_eq!(latest_timestamp(&conn, "KRW-BTC").unwrap(), Some(at(5, 3)));
    }

    #[test]
    fn test_delete_by_ticker() {
        let conn = Connection::open_in_memory().unwrap();
        upsert_batch(&conn, "KRW-BTC", &[bar(at(1, 0), 1.0), bar(at(2, 0), 2.0)]).unwrap();
        upsert_batch(&conn, "KRW-XRP", &[bar(at(1, 0), 1.0)]).unwrap();

        assert_eq!(delete_by_ticker(&conn, "KRW-BTC").unwrap(), 2);
        assert_eq!(latest_timestamp(&conn, "KRW-BTC").unwrap(), None);
        assert_eq!(latest_timestamp(&conn, "KRW-XRP").unwrap(), Some(at(1, 0)));
    }

    #[test]
    fn test_purge_before_spans_tickers() {
        let conn = Connection::open_in_memory().unwrap();
        upsert_batch(&conn, "KRW-BTC", &[bar(at(1, 0), 1.0), bar(at(3, 0), 2.0)]).unwrap();
        upsert_batch(&conn, "KRW-XRP", &[bar(at(2, 0), 1.0)]).unwrap();

        assert_eq!(purge_before(&conn, at(3, 0)).unwrap(), 2);
        assert_eq!(latest_timestamp(&conn, "KRW-XRP").unwrap(), None);
        assert_eq!(latest_timestamp(&conn, "KRW-BTC").unwrap(), Some(at(3, 0)));
    }

    #[test]
    fn test_batch_with_unstorable_timestamp_writes_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        let far = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();

        let err = upsert_batch(&conn, "KRW-BTC", &[bar(at(1, 0), 1.0), bar(far, 2.0)]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
        assert_eq!(latest_timestamp(&conn, "KRW-BTC").unwrap(), None);
    }

    #[test]
    fn test_query_range_with_fractional_start() {
        let conn = Connection::open_in_memory().unwrap();
        upsert_batch(&conn, "KRW-BTC", &[bar(at(1, 0), 1.0), bar(at(1, 1), 2.0)]).unwrap();

        let start = at(1, 0) + Duration::milliseconds(500);
        let points = query_range(&conn, "KRW-BTC", start, at(1, 1)).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].timestamp, at(1, 1));
    }

    #[test]
    fn test_retention_cutoff_saturates_for_huge_windows() {
        assert_eq!(retention_cutoff(1_000_000), NaiveDateTime::MIN);
        assert_eq!(retention_cutoff(u32::MAX), NaiveDateTime::MIN);
    }

    #[test]
    fn test_retention_cutoff_uses_365_day_years() {
        let cutoff = retention_cutoff(2);
        let expected = Utc::now().naive_utc() - Duration::days(730);
        assert!((expected - cutoff).num_seconds().abs() <= 5);
    }
}
