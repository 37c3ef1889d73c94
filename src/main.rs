//! Demo runner: exercises every store against the configured database file.
//!
//! Usage: `tickstore [config.toml]`

use anyhow::Context;
use chrono::{Duration, Utc};
use std::path::PathBuf;
use tickstore::{Config, OhlcvBar, QueueKind, RecordFields, SqliteStore};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load_or_default(config_path.as_deref()).context("loading configuration")?;
    let _guard = tickstore::logging::init(&config.logging)?;

    let store = SqliteStore::open(&config.database)
        .with_context(|| format!("opening {:?}", config.database.path))?;

    store.append(QueueKind::Msg, "Sample text for the message queue")?;
    store.append(QueueKind::Check, "Sample text for the check queue")?;
    for kind in QueueKind::ALL {
        let drained = store.drain(kind)?;
        tracing::info!("Drained from {}: {:?}", kind.table_name(), drained);
    }

    let now = Utc::now().naive_utc();
    let mut fields = RecordFields::dated(now);
    fields.value1 = Some("value1".to_string());
    fields.number1 = Some(1.0);
    let id = store.insert_record("config", &fields)?;

    fields.value1 = Some("updated1".to_string());
    fields.number1 = Some(10.0);
    store.update_record(id, &fields)?;

    let today = store.get_records_by_date("config", now.date())?;
    println!("{}", serde_json::to_string_pretty(&today)?);
    let last_day = store.get_records_between("config", now - Duration::days(1), now)?;
    tracing::info!("{} record(s) in the last day", last_day.len());

    let bars: Vec<OhlcvBar> = [100.0, 110.0, 99.0]
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            timestamp: now - Duration::minutes(3 - i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            value: close,
        })
        .collect();
    store.upsert_ohlcv("KRW-BTC", &bars)?;
    let points = store.query_ohlcv("KRW-BTC", now - Duration::minutes(5), now)?;
    println!("{}", serde_json::to_string_pretty(&points)?);
    tracing::info!("Latest KRW-BTC bar: {:?}", store.latest_ohlcv_timestamp("KRW-BTC")?);

    store.purge_records_older_than(10)?;
    store.purge_ohlcv_older_than_years(2)?;
    store.delete_record(id)?;
    Ok(())
}
