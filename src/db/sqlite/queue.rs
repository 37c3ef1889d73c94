//! Drain queues
//!
//! Producers append text; a consumer takes everything not yet seen in one
//! atomic drain. Functions here run inside the caller's transaction.

use super::models::QueueKind;
use super::schema::ensure_queue_table;
use crate::error::Result;
use rusqlite::{params, Connection};

/// Append one entry to the queue
pub fn append(conn: &Connection, kind: QueueKind, text: &str) -> Result<()> {
    ensure_queue_table(conn, kind)?;

    let sql = format!("INSERT INTO {} (text_value) VALUES (?1)", kind.table_name());
    conn.execute(&sql, params![text])?;

    tracing::debug!("Appended entry to {}", kind.table_name());
    Ok(())
}

/// Remove every entry present in the queue and return them in insertion order.
///
/// Must run in an immediate transaction so no other writer interleaves between
/// the select and the deletes.
pub fn drain(conn: &Connection, kind: QueueKind) -> Result<Vec<String>> {
    ensure_queue_table(conn, kind)?;
    let table = kind.table_name();

    let mut stmt = conn.prepare(&format!("SELECT id, text_value FROM {} ORDER BY id", table))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut delete = conn.prepare(&format!("DELETE FROM {} WHERE id = ?1", table))?;
    let mut texts = Vec::with_capacity(rows.len());
    for (id, text) in rows {
        delete.execute(params![id])?;
        texts.push(text);
    }

    if !texts.is_empty() {
        tracing::info!("Drained {} entries from {}", texts.len(), table);
    }
    Ok(texts)
}

/// Number of entries waiting in the queue
pub fn pending(conn: &Connection, kind: QueueKind) -> Result<usize> {
    ensure_queue_table(conn, kind)?;

    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", kind.table_name()),
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_insertion_order() {
        let conn = Connection::open_in_memory().unwrap();
        for text in ["a", "b", "c"] {
            append(&conn, QueueKind::Msg, text).unwrap();
        }

        assert_eq!(pending(&conn, QueueKind::Msg).unwrap(), 3);
        assert_eq!(drain(&conn, QueueKind::Msg).unwrap(), vec!["a", "b", "c"]);
        assert!(drain(&conn, QueueKind::Msg).unwrap().is_empty());
        assert_eq!(pending(&conn, QueueKind::Msg).unwrap(), 0);
    }

    #[test]
    fn test_drain_unused_queue_is_empty() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(drain(&conn, QueueKind::Check).unwrap().is_empty());
    }

    #[test]
    fn test_queues_are_independent() {
        let conn = Connection::open_in_memory().unwrap();
        append(&conn, QueueKind::Msg, "message").unwrap();
        append(&conn, QueueKind::Check, "flag").unwrap();

        assert_eq!(drain(&conn, QueueKind::Check).unwrap(), vec!["flag"]);
        assert_eq!(pending(&conn, QueueKind::Msg).unwrap(), 1);
    }

    #[test]
    fn test_append_keeps_exact_text() {
        let conn = Connection::open_in_memory().unwrap();
        let text = "  line one\nline two '; DROP TABLE table_msg; --";
        append(&conn, QueueKind::Msg, text).unwrap();
        append(&conn, QueueKind::Msg, "").unwrap();

        assert_eq!(drain(&conn, QueueKind::Msg).unwrap(), vec![text.to_string(), String::new()]);
    }
}
