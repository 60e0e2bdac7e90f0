//! Ledger store: the database handle plus the time bound every atomic unit
//! runs under.
//!
//! Atomic units go through [`LedgerStore::run_atomic`], which begins a
//! transaction, commits on success and rolls back on error.
//! Checks that guard a write (balance, budget, processed state) are
//! expressed as conditional updates inside that same transaction, so two
//! concurrent writers are serialized by the database itself.

use std::{future::Future, pin::Pin, time::Duration};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{EngineError, ResultEngine};

/// Future returned by the body of an atomic unit.
pub(crate) type TxFuture<'c, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'c>>;

#[derive(Clone, Debug)]
pub struct LedgerStore {
    database: DatabaseConnection,
    timeout: Duration,
}

impl LedgerStore {
    pub fn new(database: DatabaseConnection, timeout: Duration) -> Self {
        Self { database, timeout }
    }

    /// Connection for reads outside an atomic unit.
    ///
    /// Never use it while a unit from [`LedgerStore::run_atomic`] is open on
    /// the same task: an in-memory database has a single pooled connection.
    pub(crate) fn connection(&self) -> &DatabaseConnection {
        &self.database
    }

    /// Run `f` inside one database transaction under the store timeout.
    ///
    /// Commits when `f` succeeds and rolls back when it fails. `ctx` is handed
    /// back to `f` so the returned future may borrow it alongside the
    /// transaction.
    pub(crate) async fn run_atomic<C, T, F>(&self, ctx: &C, f: F) -> ResultEngine<T>
    where
        C: Sync,
        T: Send,
        F: for<'c> FnOnce(&'c C, &'c DatabaseTransaction) -> TxFuture<'c, T> + Send,
    {
        let unit = async {
            let db_tx = self.database.begin().await?;
            let result = f(ctx, &db_tx).await;
            match result {
                Ok(value) => {
                    db_tx.commit().await?;
                    Ok(value)
                }
                Err(err) => {
                    if let Err(rollback_err) = db_tx.rollback().await {
                        tracing::warn!(error = %rollback_err, "rollback failed");
                    }
                    Err(err)
                }
            }
        };
        self.bounded(unit).await
    }

    /// Run `unit` under the store timeout. An elapsed timeout drops the
    /// future, which rolls back any transaction it still owns.
    pub(crate) async fn bounded<T, F>(&self, unit: F) -> ResultEngine<T>
    where
        F: Future<Output = ResultEngine<T>>,
    {
        match tokio::time::timeout(self.timeout, unit).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "store timeout");
                Err(EngineError::StoreUnavailable(format!(
                    "store did not answer within {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}
