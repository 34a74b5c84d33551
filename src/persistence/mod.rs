//! PostgreSQL persistence layer.
//!
//! Row-level locking discipline: every path that mutates a wallet or a
//! resting order takes `SELECT ... FOR UPDATE` on the row first; the
//! matching engine's candidate scan adds `SKIP LOCKED` so concurrent runs
//! on one selection never block each other on the same resting order.

pub mod ledger;
pub mod markets;
pub mod orders;
pub mod schema;
pub mod trades;
pub mod users;
pub mod wallets;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgConnection, Postgres, Transaction};
use std::time::Duration;

use crate::error::CoreResult;

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create all tables and indexes if they do not exist
    pub async fn init_schema(&self) -> CoreResult<()> {
        schema::init_schema(&self.pool).await
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Begin a transaction with a hard time budget. On timeout Postgres cancels
/// the statement (57014) and the whole transaction rolls back with no
/// partial effect.
pub async fn begin_with_timeout(
    pool: &PgPool,
    budget: Duration,
) -> CoreResult<Transaction<'_, Postgres>> {
    let mut tx = pool.begin().await?;
    sqlx::query(&format!(
        "SET LOCAL statement_timeout = {}",
        budget.as_millis()
    ))
    .execute(&mut *tx)
    .await?;
    Ok(tx)
}

/// Time budget for order placement and cancellation transactions.
pub const ORDER_TX_BUDGET: Duration = Duration::from_secs(15);
/// Time budget for market settlement transactions.
pub const SETTLEMENT_TX_BUDGET: Duration = Duration::from_secs(30);

/// Shorthand used by the store modules.
pub(crate) type Conn = PgConnection;
