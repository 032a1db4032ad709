use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quire_core::models::{File, Resource, ResourceType};
use quire_core::LookupEnum;
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use super::{lock_clause, PgTx};
use crate::store::{decode, LockMode, ResourceQuery, ResourceRecord, ResourceStore};

/// Columns of a resource joined with its file; pairs with [`RESOURCE_JOINS`].
pub(crate) const RESOURCE_COLUMNS: &str = "\
    r.id AS resource_id, r.name AS resource_name, rt.name AS resource_type, \
    r.comment AS resource_comment, r.created_at AS resource_created_at, \
    f.id AS file_id, ft.name AS file_type, f.created_at AS file_created_at, f.creator_id";

pub(crate) const RESOURCE_JOINS: &str = "\
    JOIN resource_types rt ON rt.id = r.resource_type_id \
    JOIN files f ON f.id = r.file_id \
    JOIN file_types ft ON ft.id = f.file_type_id";

#[derive(Debug, FromRow)]
pub(crate) struct ResourceRow {
    resource_id: Uuid,
    resource_name: String,
    resource_type: String,
    resource_comment: String,
    resource_created_at: DateTime<Utc>,
    file_id: Uuid,
    file_type: String,
    file_created_at: DateTime<Utc>,
    creator_id: Uuid,
}

impl TryFrom<ResourceRow> for ResourceRecord {
    type Error = anyhow::Error;

    fn try_from(row: ResourceRow) -> Result<Self> {
        Ok(ResourceRecord {
            resource: Resource {
                id: row.resource_id,
                name: row.resource_name,
                resource_type: decode(&row.resource_type)?,
                comment: row.resource_comment,
                created_at: row.resource_created_at,
            },
            file: File {
                id: row.file_id,
                file_type: decode(&row.file_type)?,
                created_at: row.file_created_at,
            },
            creator_id: row.creator_id,
        })
    }
}

#[derive(Debug, FromRow)]
struct BareResourceRow {
    id: Uuid,
    name: String,
    resource_type: String,
    comment: String,
    created_at: DateTime<Utc>,
}

/// Repository for resource rows
#[derive(Clone, Default)]
pub struct ResourceRepository;

impl ResourceRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceStore<PgTx> for ResourceRepository {
    #[tracing::instrument(skip(self, tx, resource), fields(db.table = "resources", db.operation = "insert", db.record_id = %resource.id))]
    async fn save_resource(&self, tx: &mut PgTx, file_id: Uuid, resource: &Resource) -> Result<()> {
        sqlx::query::<Postgres>(
            r#"
            INSERT INTO resources (id, file_id, name, resource_type_id, comment, created_at)
            VALUES ($1, $2, $3, (SELECT id FROM resource_types WHERE name = $4), $5, $6)
            "#,
        )
        .bind(resource.id)
        .bind(file_id)
        .bind(&resource.name)
        .bind(resource.resource_type.as_db_name())
        .bind(&resource.comment)
        .bind(resource.created_at)
        .execute(&mut **tx)
        .await
        .context("Failed to insert resource")?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "resources", db.operation = "select", db.record_id = %resource_id))]
    async fn get_resource(&self, tx: &mut PgTx, resource_id: Uuid) -> Result<Option<ResourceRecord>> {
        let sql = format!(
            "SELECT {} FROM resources r {} WHERE r.id = $1",
            RESOURCE_COLUMNS, RESOURCE_JOINS
        );

        let row = sqlx::query_as::<Postgres, ResourceRow>(&sql)
            .bind(resource_id)
            .fetch_optional(&mut **tx)
            .await
            .context("Failed to get resource")?;

        row.map(ResourceRecord::try_from).transpose()
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "resources", db.operation = "select"))]
    async fn get_resources(&self, tx: &mut PgTx, query: &ResourceQuery) -> Result<Vec<ResourceRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM resources r {}
            WHERE (cardinality($1::text[]) = 0 OR rt.name = ANY($1))
              AND (cardinality($2::uuid[]) = 0 OR f.creator_id = ANY($2))
              AND (cardinality($3::uuid[]) = 0 OR EXISTS (
                    SELECT 1 FROM group_resources gr
                    WHERE gr.resource_id = r.id AND gr.group_id = ANY($3)))
            ORDER BY r.created_at DESC, r.id
            LIMIT $4 OFFSET $5
            "#,
            RESOURCE_COLUMNS, RESOURCE_JOINS
        );

        let type_names: Vec<&str> = query
            .resource_types
            .iter()
            .map(ResourceType::as_db_name)
            .collect();

        let rows = sqlx::query_as::<Postgres, ResourceRow>(&sql)
            .bind(&type_names)
            .bind(&query.creator_ids)
            .bind(&query.group_ids)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&mut **tx)
            .await
            .context("Failed to list resources")?;

        rows.into_iter().map(ResourceRecord::try_from).collect()
    }

    #[tracing::instrument(skip(self, tx, ids), fields(db.table = "resources", db.operation = "select", db.record_count = ids.len()))]
    async fn get_resources_by_ids(
        &self,
        tx: &mut PgTx,
        ids: &[Uuid],
        lock: LockMode,
    ) -> Result<Vec<Resource>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT r.id, r.name, rt.name AS resource_type, r.comment, r.created_at
            FROM resources r
            JOIN resource_types rt ON rt.id = r.resource_type_id
            WHERE r.id = ANY($1){}
            "#,
            lock_clause(lock, "r")
        );

        let rows = sqlx::query_as::<Postgres, BareResourceRow>(&sql)
            .bind(ids)
            .fetch_all(&mut **tx)
            .await
            .context("Failed to get resources by ids")?;

        rows.into_iter()
            .map(|row| {
                Ok(Resource {
                    id: row.id,
                    name: row.name,
                    resource_type: decode(&row.resource_type)?,
                    comment: row.comment,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
