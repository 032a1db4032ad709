use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quire_core::models::File;
use quire_core::LookupEnum;
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use super::{lock_clause, PgTx};
use crate::store::{decode, FileRecord, FileStore, LockMode};

#[derive(Debug, FromRow)]
struct FileRow {
    id: Uuid,
    file_type: String,
    creator_id: Uuid,
    created_at: DateTime<Utc>,
}

impl FileRow {
    fn into_file(self) -> Result<(File, Uuid)> {
        let file = File {
            id: self.id,
            file_type: decode(&self.file_type)?,
            created_at: self.created_at,
        };
        Ok((file, self.creator_id))
    }
}

/// Repository for file records. File bytes live in `quire-storage`.
#[derive(Clone, Default)]
pub struct FileRepository;

impl FileRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileStore<PgTx> for FileRepository {
    #[tracing::instrument(skip(self, tx, file), fields(db.table = "files", db.operation = "insert", db.record_id = %file.id))]
    async fn save_file(&self, tx: &mut PgTx, creator_id: Uuid, file: &File) -> Result<()> {
        sqlx::query::<Postgres>(
            r#"
            INSERT INTO files (id, file_type_id, creator_id, created_at)
            VALUES ($1, (SELECT id FROM file_types WHERE name = $2), $3, $4)
            "#,
        )
        .bind(file.id)
        .bind(file.file_type.as_db_name())
        .bind(creator_id)
        .bind(file.created_at)
        .execute(&mut **tx)
        .await
        .context("Failed to insert file")?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "files", db.operation = "select", db.record_id = %file_id))]
    async fn get_file(
        &self,
        tx: &mut PgTx,
        file_id: Uuid,
        lock: LockMode,
    ) -> Result<Option<FileRecord>> {
        let sql = format!(
            r#"
            SELECT f.id, ft.name AS file_type, f.creator_id, f.created_at
            FROM files f
            JOIN file_types ft ON ft.id = f.file_type_id
            WHERE f.id = $1{}
            "#,
            lock_clause(lock, "f")
        );

        let row = sqlx::query_as::<Postgres, FileRow>(&sql)
            .bind(file_id)
            .fetch_optional(&mut **tx)
            .await
            .context("Failed to get file")?;

        row.map(|row| {
            let (file, creator_id) = row.into_file()?;
            Ok(FileRecord { file, creator_id })
        })
        .transpose()
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "files", db.operation = "select", resource.id = %resource_id))]
    async fn get_file_by_resource_id(
        &self,
        tx: &mut PgTx,
        resource_id: Uuid,
    ) -> Result<Option<File>> {
        let row = sqlx::query_as::<Postgres, FileRow>(
            r#"
            SELECT f.id, ft.name AS file_type, f.creator_id, f.created_at
            FROM resources r
            JOIN files f ON f.id = r.file_id
            JOIN file_types ft ON ft.id = f.file_type_id
            WHERE r.id = $1
            "#,
        )
        .bind(resource_id)
        .fetch_optional(&mut **tx)
        .await
        .context("Failed to get file by resource id")?;

        row.map(|row| row.into_file().map(|(file, _)| file))
            .transpose()
    }
}
