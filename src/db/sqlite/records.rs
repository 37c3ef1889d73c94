//! Tagged time-series records
//!
//! One shared table for every record type. Dates are stored as
//! `YYYY-MM-DD HH:MM:SS` text, so range and cutoff comparisons are plain
//! string comparisons. Dates must fall in years 0000-9999 for that to hold.

use super::models::{Record, RecordFields};
use super::schema::{
    ceil_bound, check_storable, days_before_now, ensure_records_table, floor_bound, format_date,
    format_timestamp,
};
use crate::error::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SELECT_COLUMNS: &str = "SELECT id, type, value1, value2, value3, value4,
        number1, number2, number3, number4, date
 FROM common_data";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        kind: row.get(1)?,
        fields: RecordFields {
            value1: row.get(2)?,
            value2: row.get(3)?,
            value3: row.get(4)?,
            value4: row.get(5)?,
            number1: row.get(6)?,
            number2: row.get(7)?,
            number3: row.get(8)?,
            number4: row.get(9)?,
            date: row.get(10)?,
        },
    })
}

/// Insert a record, returning its id
pub fn insert(conn: &Connection, kind: &str, fields: &RecordFields) -> Result<i64> {
    check_storable(&fields.date)?;
    ensure_records_table(conn)?;
    let date = format_timestamp(&fields.date);

    conn.execute(
        r#"
        INSERT INTO common_data (type, value1, value2, value3, value4,
                                 number1, number2, number3, number4, date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            kind,
            fields.value1,
            fields.value2,
            fields.value3,
            fields.value4,
            fields.number1,
            fields.number2,
            fields.number3,
            fields.number4,
            date,
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!("Inserted record {} of type {} dated {}", id, kind, date);
    Ok(id)
}

/// Get a record by id
pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Record>> {
    ensure_records_table(conn)?;

    let record = conn
        .query_row(&format!("{} WHERE id = ?1", SELECT_COLUMNS), params![id], record_from_row)
        .optional()?;
    Ok(record)
}

/// Records of `kind` dated on the same calendar day as `day`
pub fn get_by_date(conn: &Connection, kind: &str, day: NaiveDate) -> Result<Vec<Record>> {
    ensure_records_table(conn)?;

    let mut stmt = conn.prepare(&format!(
        "{} WHERE type = ?1 AND DATE(date) = ?2 ORDER BY date, id",
        SELECT_COLUMNS
    ))?;
    let records = stmt
        .query_map(params![kind, format_date(&day)], record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    tracing::debug!("Loaded {} {} records for {}", records.len(), kind, day);
    Ok(records)
}

/// Records of `kind` dated within `[start, end]`. Empty when `start > end`.
///
/// Stored dates have whole seconds; a fractional `start` excludes its own second.
pub fn get_by_date_range(
    conn: &Connection,
    kind: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Record>> {
    ensure_records_table(conn)?;

    let mut stmt = conn.prepare(&format!(
        "{} WHERE type = ?1 AND date BETWEEN ?2 AND ?3 ORDER BY date, id",
        SELECT_COLUMNS
    ))?;
    let records = stmt
        .query_map(
            params![kind, ceil_bound(&start), floor_bound(&end)],
            record_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    tracing::debug!("Loaded {} {} records between {} and {}", records.len(), kind, start, end);
    Ok(records)
}

/// Replace every mutable field of record `id`. Returns rows affected (0 if absent).
pub fn update_by_id(conn: &Connection, id: i64, fields: &RecordFields) -> Result<usize> {
    check_storable(&fields.date)?;
    ensure_records_table(conn)?;

    let rows = conn.execute(
        r#"
        UPDATE common_data
        SET value1 = ?1, value2 = ?2, value3 = ?3, value4 = ?4,
            number1 = ?5, number2 = ?6, number3 = ?7, number4 = ?8,
            date = ?9
        WHERE id = ?10
        "#,
        params![
            fields.value1,
            fields.value2,
            fields.value3,
            fields.value4,
            fields.number1,
            fields.number2,
            fields.number3,
            fields.number4,
            format_timestamp(&fields.date),
            id,
        ],
    )?;

    tracing::info!("Updated {} record(s) with id {}", rows, id);
    Ok(rows)
}

/// Delete record `id`. Returns rows removed (0 or 1).
pub fn delete_by_id(conn: &Connection, id: i64) -> Result<usize> {
    ensure_records_table(conn)?;

    let rows = conn.execute("DELETE FROM common_data WHERE id = ?1", params![id])?;
    tracing::info!("Deleted {} record(s) with id {}", rows, id);
    Ok(rows)
}

/// Delete every record dated strictly before `cutoff`
pub fn purge_before(conn: &Connection, cutoff: NaiveDateTime) -> Result<usize> {
    ensure_records_table(conn)?;
    let cutoff = ceil_bound(&cutoff);

    let rows = conn.execute("DELETE FROM common_data WHERE date < ?1", params![cutoff])?;
    if rows > 0 {
        tracing::info!("Purged {} record(s) dated before {}", rows, cutoff);
    }
    Ok(rows)
}

/// Cutoff for a `days`-old retention window, relative to now (UTC).
///
/// Windows reaching past the earliest representable time purge nothing.
pub fn retention_cutoff(days: u32) -> NaiveDateTime {
    days_before_now(i64::from(days))
}
