//! SQLite connection acquisition
//!
//! Every store operation asks a [`ConnectionSource`] for exactly one connection,
//! uses it for one unit of work and drops it. Whether that connection was opened
//! for the call or checked out of a pool is the source's business.

use crate::config::{DatabaseConfig, JournalMode};
use crate::error::Result;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::time::Duration;

/// Hands out a connection scoped to one unit of work
pub trait ConnectionSource {
    type Conn: DerefMut<Target = Connection>;

    fn acquire(&self) -> Result<Self::Conn>;
}

/// Apply per-connection settings
fn configure(conn: &Connection, busy_timeout: Duration, journal_mode: JournalMode) -> rusqlite::Result<()> {
    // busy_timeout first so the journal switch itself waits on contended files
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(&format!(
        "PRAGMA journal_mode={}; PRAGMA synchronous=NORMAL;",
        journal_mode.as_str()
    ))
}

/// Opens a fresh connection for every call
#[derive(Debug, Clone)]
pub struct FileConnector {
    path: PathBuf,
    busy_timeout: Duration,
    journal_mode: JournalMode,
}

impl FileConnector {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration, journal_mode: JournalMode) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
            journal_mode,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.path.clone(), config.busy_timeout(), config.journal_mode)
    }
}

impl ConnectionSource for FileConnector {
    type Conn = Box<Connection>;

    fn acquire(&self) -> Result<Self::Conn> {
        let conn = Connection::open(&self.path)?;
        configure(&conn, self.busy_timeout, self.journal_mode)?;
        Ok(Box::new(conn))
    }
}

/// Checks connections out of an r2d2 pool
#[derive(Clone)]
pub struct PooledConnector {
    pool: Pool<SqliteConnectionManager>,
}

impl PooledConnector {
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool_config = config.pool.clone().unwrap_or_default();
        let busy_timeout = config.busy_timeout();
        let journal_mode = config.journal_mode;

        let manager = SqliteConnectionManager::file(&config.path)
            .with_init(move |conn| configure(conn, busy_timeout, journal_mode));

        let pool = Pool::builder()
            .max_size(pool_config.max_size)
            // one eager connection settles the journal mode; the rest open on demand
            .min_idle(Some(1))
            .connection_timeout(Duration::from_secs(pool_config.connection_timeout_secs))
            .build(manager)?;

        tracing::debug!(
            "Opened connection pool for {:?} (max_size: {})",
            config.path,
            pool_config.max_size
        );
        Ok(Self { pool })
    }
}

impl ConnectionSource for PooledConnector {
    type Conn = PooledConnection<SqliteConnectionManager>;

    fn acquire(&self) -> Result<Self::Conn> {
        Ok(self.pool.get()?)
    }
}

/// Connector selected by configuration
#[derive(Clone)]
pub enum Connector {
    File(FileConnector),
    Pooled(PooledConnector),
}

impl Connector {
    /// Pooled when `database.pool` is configured, per-call otherwise
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        match config.pool {
            Some(_) => Ok(Connector::Pooled(PooledConnector::from_config(config)?)),
            None => Ok(Connector::File(FileConnector::from_config(config))),
        }
    }
}

/// Connection handed out by [`Connector`]
pub enum StoreConnection {
    Direct(Box<Connection>),
    Pooled(PooledConnection<SqliteConnectionManager>),
}

impl Deref for StoreConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            StoreConnection::Direct(conn) => &**conn,
            StoreConnection::Pooled(conn) => &**conn,
        }
    }
}

impl DerefMut for StoreConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        match self {
            StoreConnection::Direct(conn) => &mut **conn,
            StoreConnection::Pooled(conn) => &mut **conn,
        }
    }
}

impl ConnectionSource for Connector {
    type Conn = StoreConnection;

    fn acquire(&self) -> Result<Self::Conn> {
        match self {
            Connector::File(c) => c.acquire().map(StoreConnection::Direct),
            Connector::Pooled(c) => c.acquire().map(StoreConnection::Pooled),
        }
    }
}
