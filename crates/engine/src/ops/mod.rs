use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, SqlErr};

use crate::{
    EngineError, LedgerConfig, ResultEngine,
    store::{LedgerStore, TxFuture},
};

mod access;
mod balances;
mod events;
mod promotions;
mod transactions;
mod users;

pub use balances::BalanceReport;
pub use events::AwardResult;
pub use transactions::TransactionResult;

#[derive(Debug)]
pub struct Engine {
    store: LedgerStore,
    config: LedgerConfig,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run a block inside a DB transaction, committing on success and rolling
    /// back on error.
    pub(crate) async fn with_tx<T, F>(&self, f: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c Engine, &'c DatabaseTransaction) -> TxFuture<'c, T> + Send,
    {
        self.store.run_atomic(self, f).await
    }

    fn database(&self) -> &DatabaseConnection {
        self.store.connection()
    }
}

/// Map a unique-key violation to `conflict`; anything else goes through the
/// usual `DbErr` conversion.
fn on_unique_violation(db_err: DbErr, conflict: EngineError) -> EngineError {
    match db_err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => conflict,
        _ => db_err.into(),
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    config: LedgerConfig,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the ledger tunables (points rate, store timeout).
    pub fn config(mut self, config: LedgerConfig) -> EngineBuilder {
        self.config = config;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.config.cents_per_point <= 0 {
            return Err(EngineError::Validation(
                "cents_per_point must be > 0".to_string(),
            ));
        }
        Ok(Engine {
            store: LedgerStore::new(self.database, self.config.store_timeout),
            config: self.config,
        })
    }
}
