//! Database transaction seam for PostgreSQL
//!
//! An uncommitted `sqlx::Transaction` rolls back when dropped, which covers
//! request cancellation and timeouts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::store::Database;

pub type PgTx = Transaction<'static, Postgres>;

/// Connection pool wrapper opening store transactions
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        self.pool
            .begin()
            .await
            .context("Failed to begin database transaction")
    }

    async fn commit(&self, tx: PgTx) -> Result<()> {
        tx.commit()
            .await
            .context("Failed to commit database transaction")
    }

    async fn rollback(&self, tx: PgTx) -> Result<()> {
        tx.rollback()
            .await
            .context("Failed to rollback database transaction")
    }
}
