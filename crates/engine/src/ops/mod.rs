use std::{fmt, future::Future, pin::Pin, sync::Arc, time::Duration};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::warn;

use crate::{ProductStock, ResultEngine, StockAdjuster};

mod banking;
mod counterparties;
mod ledger;
mod purchases;
mod reconcile;
mod registry;
mod sales;
mod stock;

pub use reconcile::{
    AccountDrift, AggregateTotals, CounterpartyDrift, JournalTotals, ReconciliationReport,
    SaleDrift,
};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(20);

type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

#[derive(Clone)]
pub struct Engine {
    database: DatabaseConnection,
    stock: Arc<dyn StockAdjuster>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Run `op` inside a DB transaction, committing on success and rolling
    /// back on error.
    ///
    /// A transient storage error (locked database, unique-index race) rolls
    /// back and re-runs `op` from scratch, up to `max_attempts` times with a
    /// linear back-off. Any other error is returned as is. `op` may therefore
    /// run more than once and must only touch state through `db_tx`.
    pub(crate) async fn with_tx<T, F>(&self, op: F) -> ResultEngine<T>
    where
        F: for<'a> Fn(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T>,
    {
        let mut attempt: u32 = 1;
        loop {
            match self.run_once(&op).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient storage conflict, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn run_once<T, F>(&self, op: &F) -> ResultEngine<T>
    where
        F: for<'a> Fn(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T>,
    {
        let db_tx = self.database.begin().await?;
        let result = op(self, &db_tx).await;
        match result {
            Ok(value) => {
                db_tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = db_tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    stock: Arc<dyn StockAdjuster>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            stock: Arc::new(ProductStock),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Replace the built-in `products` table stock keeping.
    pub fn stock_adjuster(mut self, stock: Arc<dyn StockAdjuster>) -> EngineBuilder {
        self.stock = stock;
        self
    }

    /// Total tries for one operation, first run included. Clamped to >= 1.
    pub fn max_attempts(mut self, attempts: u32) -> EngineBuilder {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> EngineBuilder {
        self.retry_backoff = backoff;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            stock: self.stock,
            max_attempts: self.max_attempts,
            retry_backoff: self.retry_backoff,
        })
    }
}
