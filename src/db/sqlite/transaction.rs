//! One logical operation, one connection, one transaction

use super::connection::ConnectionSource;
use crate::error::Result;
use rusqlite::{Transaction, TransactionBehavior};

/// Wraps open/begin/commit/rollback/close around a single operation.
///
/// The connection is acquired at the start of [`write`](Self::write) or
/// [`read`](Self::read) and dropped before it returns, on every path.
pub struct TransactionalUnit<S> {
    source: S,
}

impl<S: ConnectionSource> TransactionalUnit<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run `f` inside `BEGIN IMMEDIATE`; the write lock is taken up front.
    pub fn write<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run(operation, TransactionBehavior::Immediate, f)
    }

    /// Run `f` inside a deferred transaction for a consistent read.
    pub fn read<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.run(operation, TransactionBehavior::Deferred, f)
    }

    fn run<T, F>(&self, operation: &str, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let outcome = self.execute(behavior, f).map_err(|e| e.classify(operation));
        if let Err(e) = &outcome {
            tracing::error!(operation, kind = ?e.kind(), "Store operation failed: {}", e);
        }
        outcome
    }

    fn execute<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.source.acquire()?;
        let tx = conn.transaction_with_behavior(behavior)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}
