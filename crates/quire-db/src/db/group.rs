use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quire_core::models::{Group, GroupType};
use quire_core::LookupEnum;
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use super::resource::{ResourceRow, RESOURCE_COLUMNS, RESOURCE_JOINS};
use super::{lock_clause, PgTx};
use crate::store::{decode, GroupQuery, GroupRecord, GroupStore, LockMode, ResourceRecord};

const GROUP_COLUMNS: &str = "\
    g.id, g.name, gt.name AS group_type, g.description, \
    rp.name AS read_permission, wp.name AS write_permission, g.created_at";

const GROUP_JOINS: &str = "\
    JOIN group_types gt ON gt.id = g.group_type_id \
    JOIN read_permissions rp ON rp.id = g.read_permission_id \
    JOIN write_permissions wp ON wp.id = g.write_permission_id \
    JOIN resources r ON r.id = g.main_resource_id";

#[derive(Debug, FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    group_type: String,
    description: String,
    read_permission: String,
    write_permission: String,
    created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    main_resource: ResourceRow,
}

impl TryFrom<GroupRow> for GroupRecord {
    type Error = anyhow::Error;

    fn try_from(row: GroupRow) -> Result<Self> {
        Ok(GroupRecord {
            group: Group {
                id: row.id,
                name: row.name,
                group_type: decode(&row.group_type)?,
                description: row.description,
                read_permission: decode(&row.read_permission)?,
                write_permission: decode(&row.write_permission)?,
                created_at: row.created_at,
            },
            main_resource: ResourceRecord::try_from(row.main_resource)?,
        })
    }
}

/// Repository for groups and their resource membership
#[derive(Clone, Default)]
pub struct GroupRepository;

impl GroupRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GroupStore<PgTx> for GroupRepository {
    #[tracing::instrument(skip(self, tx, group), fields(db.table = "groups", db.operation = "insert", db.record_id = %group.id))]
    async fn save_group(&self, tx: &mut PgTx, group: &Group, main_resource_id: Uuid) -> Result<()> {
        sqlx::query::<Postgres>(
            r#"
            INSERT INTO groups (
                id, name, group_type_id, description,
                read_permission_id, write_permission_id, main_resource_id, created_at
            )
            VALUES (
                $1, $2, (SELECT id FROM group_types WHERE name = $3), $4,
                (SELECT id FROM read_permissions WHERE name = $5),
                (SELECT id FROM write_permissions WHERE name = $6),
                $7, $8
            )
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(group.group_type.as_db_name())
        .bind(&group.description)
        .bind(group.read_permission.as_db_name())
        .bind(group.write_permission.as_db_name())
        .bind(main_resource_id)
        .bind(group.created_at)
        .execute(&mut **tx)
        .await
        .context("Failed to insert group")?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx, group), fields(db.table = "groups", db.operation = "update", db.record_id = %group.id))]
    async fn edit_group(&self, tx: &mut PgTx, group: &Group, main_resource_id: Uuid) -> Result<u64> {
        let result = sqlx::query::<Postgres>(
            r#"
            UPDATE groups SET
                name = $2,
                group_type_id = (SELECT id FROM group_types WHERE name = $3),
                description = $4,
                read_permission_id = (SELECT id FROM read_permissions WHERE name = $5),
                write_permission_id = (SELECT id FROM write_permissions WHERE name = $6),
                main_resource_id = $7
            WHERE id = $1
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(group.group_type.as_db_name())
        .bind(&group.description)
        .bind(group.read_permission.as_db_name())
        .bind(group.write_permission.as_db_name())
        .bind(main_resource_id)
        .execute(&mut **tx)
        .await
        .context("Failed to update group")?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "groups", db.operation = "delete", db.record_id = %group_id))]
    async fn delete_group(&self, tx: &mut PgTx, group_id: Uuid) -> Result<()> {
        // Membership and administrator rows cascade.
        sqlx::query::<Postgres>("DELETE FROM groups WHERE id = $1")
            .bind(group_id)
            .execute(&mut **tx)
            .await
            .context("Failed to delete group")?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx, resource_ids), fields(db.table = "group_resources", db.operation = "insert", group.id = %group_id, db.record_count = resource_ids.len()))]
    async fn add_resources(&self, tx: &mut PgTx, group_id: Uuid, resource_ids: &[Uuid]) -> Result<()> {
        if resource_ids.is_empty() {
            return Ok(());
        }

        sqlx::query::<Postgres>(
            r#"
            INSERT INTO group_resources (group_id, resource_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(group_id)
        .bind(resource_ids)
        .execute(&mut **tx)
        .await
        .context("Failed to add group resources")?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx, resource_ids), fields(db.table = "group_resources", db.operation = "delete", group.id = %group_id, db.record_count = resource_ids.len()))]
    async fn delete_resources(
        &self,
        tx: &mut PgTx,
        group_id: Uuid,
        resource_ids: &[Uuid],
    ) -> Result<()> {
        if resource_ids.is_empty() {
            return Ok(());
        }

        sqlx::query::<Postgres>(
            "DELETE FROM group_resources WHERE group_id = $1 AND resource_id = ANY($2)",
        )
        .bind(group_id)
        .bind(resource_ids)
        .execute(&mut **tx)
        .await
        .context("Failed to delete group resources")?;

        Ok(())
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "groups", db.operation = "select", db.record_id = %group_id, db.lock = ?lock))]
    async fn get_group(
        &self,
        tx: &mut PgTx,
        group_id: Uuid,
        lock: LockMode,
    ) -> Result<Option<GroupRecord>> {
        let sql = format!(
            "SELECT {}, {} FROM groups g {} {} WHERE g.id = $1{}",
            GROUP_COLUMNS,
            RESOURCE_COLUMNS,
            GROUP_JOINS,
            RESOURCE_JOINS,
            lock_clause(lock, "g")
        );

        let row = sqlx::query_as::<Postgres, GroupRow>(&sql)
            .bind(group_id)
            .fetch_optional(&mut **tx)
            .await
            .context("Failed to get group")?;

        row.map(GroupRecord::try_from).transpose()
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "group_resources", db.operation = "select", group.id = %group_id))]
    async fn get_member_ids(&self, tx: &mut PgTx, group_id: Uuid) -> Result<Vec<Uuid>> {
        sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT resource_id FROM group_resources WHERE group_id = $1",
        )
        .bind(group_id)
        .fetch_all(&mut **tx)
        .await
        .context("Failed to get group members")
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "groups", db.operation = "select"))]
    async fn get_groups(&self, tx: &mut PgTx, query: &GroupQuery) -> Result<Vec<GroupRecord>> {
        let sql = format!(
            r#"
            SELECT {}, {} FROM groups g {} {}
            WHERE (cardinality($1::text[]) = 0 OR gt.name = ANY($1))
              AND (cardinality($2::uuid[]) = 0 OR f.creator_id = ANY($2))
            ORDER BY g.created_at DESC, g.id
            LIMIT $3 OFFSET $4
            "#,
            GROUP_COLUMNS, RESOURCE_COLUMNS, GROUP_JOINS, RESOURCE_JOINS
        );

        let type_names: Vec<&str> = query
            .group_types
            .iter()
            .map(GroupType::as_db_name)
            .collect();

        let rows = sqlx::query_as::<Postgres, GroupRow>(&sql)
            .bind(&type_names)
            .bind(&query.creator_ids)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&mut **tx)
            .await
            .context("Failed to list groups")?;

        rows.into_iter().map(GroupRecord::try_from).collect()
    }
}
