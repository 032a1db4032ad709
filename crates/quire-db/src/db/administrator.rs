use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Postgres;
use uuid::Uuid;

use super::PgTx;
use crate::store::AdministratorStore;

/// Repository for group administrators
#[derive(Clone, Default)]
pub struct AdministratorRepository;

impl AdministratorRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdministratorStore<PgTx> for AdministratorRepository {
    #[tracing::instrument(skip(self, tx, user_ids), fields(db.table = "administrators", db.operation = "insert", group.id = %group_id))]
    async fn save_administrators(
        &self,
        tx: &mut PgTx,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        sqlx::query::<Postgres>(
            r#"
            INSERT INTO administrators (group_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_ids)
        .execute(&mut **tx)
        .await
        .context("Failed to insert administrators")?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "administrators", db.operation = "select", group.id = %group_id))]
    async fn get_administrators(&self, tx: &mut PgTx, group_id: Uuid) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT user_id FROM administrators WHERE group_id = $1 ORDER BY user_id",
        )
        .bind(group_id)
        .fetch_all(&mut **tx)
        .await
        .context("Failed to get administrators")
    }
}
