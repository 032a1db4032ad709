//! Store contracts
//!
//! The orchestrators never see sqlx directly. They open a transaction through
//! [`Database`] and hand `&mut Tx` to the store traits below, which lets the
//! PostgreSQL repositories and the in-memory test database share one call
//! shape. Not-found is `Ok(None)`; every `Err` is an infrastructure failure.

use anyhow::Result;
use async_trait::async_trait;
use quire_core::models::{File, Group, GroupType, Resource, ResourceType};
use std::sync::Arc;
use uuid::Uuid;

/// Row locking applied to a point read inside a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Plain read
    #[default]
    None,
    /// Pessimistic row lock held until the transaction ends (`FOR UPDATE`)
    Record,
}

/// Transaction seam
///
/// Dropping a `Tx` without committing must discard its writes, so that a
/// cancelled request never leaves partial state behind.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> Result<()>;

    async fn rollback(&self, tx: Self::Tx) -> Result<()>;
}

/// Completes a transaction according to `outcome`: commit on `Ok`, rollback on
/// `Err`. A failed rollback is logged and the original error returned.
pub async fn finish<D, T, E>(db: &D, tx: D::Tx, outcome: Result<T, E>) -> Result<T, E>
where
    D: Database + ?Sized,
    E: From<anyhow::Error>,
{
    match outcome {
        Ok(value) => {
            db.commit(tx).await.map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = db.rollback(tx).await {
                tracing::warn!(error = %rollback_err, "Failed to roll back transaction");
            }
            Err(err)
        }
    }
}

/// File row with the user who uploaded it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub file: File,
    pub creator_id: Uuid,
}

/// Resource row joined with its backing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub resource: Resource,
    pub file: File,
    /// Creator of the backing file
    pub creator_id: Uuid,
}

/// Group row joined with its main resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub group: Group,
    pub main_resource: ResourceRecord,
}

/// Resource listing filter. Empty vectors do not filter.
#[derive(Debug, Clone, Default)]
pub struct ResourceQuery {
    pub resource_types: Vec<ResourceType>,
    pub creator_ids: Vec<Uuid>,
    pub group_ids: Vec<Uuid>,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl ResourceQuery {
    pub fn members_of(group_id: Uuid) -> Self {
        Self {
            group_ids: vec![group_id],
            ..Default::default()
        }
    }
}

/// Group listing filter. Empty vectors do not filter; `creator_ids` matches
/// the creator of the main resource.
#[derive(Debug, Clone, Default)]
pub struct GroupQuery {
    pub group_types: Vec<GroupType>,
    pub creator_ids: Vec<Uuid>,
    pub limit: Option<i64>,
    pub offset: i64,
}

#[async_trait]
pub trait FileStore<Tx: Send>: Send + Sync {
    async fn save_file(&self, tx: &mut Tx, creator_id: Uuid, file: &File) -> Result<()>;

    async fn get_file(&self, tx: &mut Tx, file_id: Uuid, lock: LockMode)
        -> Result<Option<FileRecord>>;

    async fn get_file_by_resource_id(&self, tx: &mut Tx, resource_id: Uuid)
        -> Result<Option<File>>;
}

#[async_trait]
pub trait ResourceStore<Tx: Send>: Send + Sync {
    async fn save_resource(&self, tx: &mut Tx, file_id: Uuid, resource: &Resource) -> Result<()>;

    async fn get_resource(&self, tx: &mut Tx, resource_id: Uuid)
        -> Result<Option<ResourceRecord>>;

    /// Newest first.
    async fn get_resources(&self, tx: &mut Tx, query: &ResourceQuery)
        -> Result<Vec<ResourceRecord>>;

    /// The subset of `ids` that exists. Callers compare lengths to detect
    /// missing IDs, so `ids` must not contain duplicates.
    async fn get_resources_by_ids(
        &self,
        tx: &mut Tx,
        ids: &[Uuid],
        lock: LockMode,
    ) -> Result<Vec<Resource>>;
}

#[async_trait]
pub trait GroupStore<Tx: Send>: Send + Sync {
    async fn save_group(&self, tx: &mut Tx, group: &Group, main_resource_id: Uuid) -> Result<()>;

    /// Overwrites the group row. Returns the number of rows affected.
    async fn edit_group(&self, tx: &mut Tx, group: &Group, main_resource_id: Uuid)
        -> Result<u64>;

    async fn delete_group(&self, tx: &mut Tx, group_id: Uuid) -> Result<()>;

    async fn add_resources(&self, tx: &mut Tx, group_id: Uuid, resource_ids: &[Uuid])
        -> Result<()>;

    async fn delete_resources(
        &self,
        tx: &mut Tx,
        group_id: Uuid,
        resource_ids: &[Uuid],
    ) -> Result<()>;

    async fn get_group(&self, tx: &mut Tx, group_id: Uuid, lock: LockMode)
        -> Result<Option<GroupRecord>>;

    async fn get_member_ids(&self, tx: &mut Tx, group_id: Uuid) -> Result<Vec<Uuid>>;

    /// Newest first.
    async fn get_groups(&self, tx: &mut Tx, query: &GroupQuery) -> Result<Vec<GroupRecord>>;
}

#[async_trait]
pub trait AdministratorStore<Tx: Send>: Send + Sync {
    async fn save_administrators(&self, tx: &mut Tx, group_id: Uuid, user_ids: &[Uuid])
        -> Result<()>;

    async fn get_administrators(&self, tx: &mut Tx, group_id: Uuid) -> Result<Vec<Uuid>>;
}

/// Every store the orchestrators need, sharing one transaction type
pub struct Stores<Tx: Send> {
    pub files: Arc<dyn FileStore<Tx>>,
    pub resources: Arc<dyn ResourceStore<Tx>>,
    pub groups: Arc<dyn GroupStore<Tx>>,
    pub administrators: Arc<dyn AdministratorStore<Tx>>,
}

impl<Tx: Send> Clone for Stores<Tx> {
    fn clone(&self) -> Self {
        Self {
            files: Arc::clone(&self.files),
            resources: Arc::clone(&self.resources),
            groups: Arc::clone(&self.groups),
            administrators: Arc::clone(&self.administrators),
        }
    }
}

/// Map a stored lookup name back to its enum, treating an unknown name as corruption.
pub(crate) fn decode<T: quire_core::LookupEnum>(name: &str) -> Result<T> {
    T::from_db_name(name).ok_or_else(|| anyhow::anyhow!("Unknown {} value: {}", T::TABLE, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::models::FileType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDatabase {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    #[async_trait]
    impl Database for CountingDatabase {
        type Tx = ();

        async fn begin(&self) -> Result<()> {
            Ok(())
        }

        async fn commit(&self, _tx: ()) -> Result<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(&self, _tx: ()) -> Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_finish_commits_on_ok() {
        let db = CountingDatabase::default();
        let tx = db.begin().await.unwrap();

        let result: Result<u32, anyhow::Error> = finish(&db, tx, Ok(7)).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(db.commits.load(Ordering::SeqCst), 1);
        assert_eq!(db.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_finish_rolls_back_on_err() {
        let db = CountingDatabase::default();
        let tx = db.begin().await.unwrap();

        let result: Result<u32, anyhow::Error> =
            finish(&db, tx, Err(anyhow::anyhow!("no such group"))).await;

        assert_eq!(result.unwrap_err().to_string(), "no such group");
        assert_eq!(db.commits.load(Ordering::SeqCst), 0);
        assert_eq!(db.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_decode_rejects_unknown_names() {
        assert_eq!(decode::<FileType>("png").unwrap(), FileType::Png);
        assert!(decode::<FileType>("tiff").is_err());
    }
}
