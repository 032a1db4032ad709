//! In-memory [`Database`] with the same transaction semantics as PostgreSQL
//! for the purposes of the orchestrators: a transaction works on a private
//! copy of the state, commit publishes it, rollback or drop discards it.
//! Transactions are serialized, which stands in for row locks.

use anyhow::Result;
use async_trait::async_trait;
use quire_core::models::{File, FileType, Group, Resource, ResourceType};
use quire_db::{
    AdministratorStore, Database, FileRecord, FileStore, GroupQuery, GroupRecord, GroupStore,
    LockMode, ResourceQuery, ResourceRecord, ResourceStore, Stores,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// A single membership row write, recorded in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipWrite {
    Added { group_id: Uuid, resource_id: Uuid },
    Removed { group_id: Uuid, resource_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct StoredResource {
    pub resource: Resource,
    pub file_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct StoredGroup {
    pub group: Group,
    pub main_resource_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub files: HashMap<Uuid, FileRecord>,
    pub resources: HashMap<Uuid, StoredResource>,
    pub groups: HashMap<Uuid, StoredGroup>,
    /// `(group_id, resource_id)` in insertion order
    pub members: Vec<(Uuid, Uuid)>,
    /// `(group_id, user_id)` in insertion order
    pub administrators: Vec<(Uuid, Uuid)>,
}

impl MemoryState {
    fn resource_record(&self, resource_id: Uuid) -> Result<Option<ResourceRecord>> {
        let Some(stored) = self.resources.get(&resource_id) else {
            return Ok(None);
        };
        let file = self
            .files
            .get(&stored.file_id)
            .ok_or_else(|| anyhow::anyhow!("Resource {} has no file", resource_id))?;

        Ok(Some(ResourceRecord {
            resource: stored.resource.clone(),
            file: file.file.clone(),
            creator_id: file.creator_id,
        }))
    }

    fn group_record(&self, group_id: Uuid) -> Result<Option<GroupRecord>> {
        let Some(stored) = self.groups.get(&group_id) else {
            return Ok(None);
        };
        let main_resource = self
            .resource_record(stored.main_resource_id)?
            .ok_or_else(|| anyhow::anyhow!("Group {} has no main resource", group_id))?;

        Ok(Some(GroupRecord {
            group: stored.group.clone(),
            main_resource,
        }))
    }

    pub fn member_ids(&self, group_id: Uuid) -> Vec<Uuid> {
        self.members
            .iter()
            .filter(|(g, _)| *g == group_id)
            .map(|(_, r)| *r)
            .collect()
    }

    pub fn administrator_ids(&self, group_id: Uuid) -> Vec<Uuid> {
        self.administrators
            .iter()
            .filter(|(g, _)| *g == group_id)
            .map(|(_, u)| *u)
            .collect()
    }
}

pub struct MemoryTx {
    state: MemoryState,
    journal: Vec<MembershipWrite>,
    _writer: OwnedMutexGuard<()>,
}

#[derive(Default)]
pub struct MemoryDatabase {
    committed: Mutex<MemoryState>,
    journal: Mutex<Vec<MembershipWrite>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    fail_commit: AtomicBool,
    stall_commit: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stores() -> Stores<MemoryTx> {
        Stores {
            files: Arc::new(MemoryStore),
            resources: Arc::new(MemoryStore),
            groups: Arc::new(MemoryStore),
            administrators: Arc::new(MemoryStore),
        }
    }

    /// Copy of the committed state
    pub fn snapshot(&self) -> MemoryState {
        self.committed.lock().unwrap().clone()
    }

    /// Committed membership writes, oldest first
    pub fn journal(&self) -> Vec<MembershipWrite> {
        self.journal.lock().unwrap().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// Makes the next commit fail and discard its transaction.
    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Makes the next commit wait forever while holding its transaction.
    pub fn stall_next_commit(&self) {
        self.stall_commit.store(true, Ordering::SeqCst);
    }

    /// Whether no transaction currently holds the writer lock
    pub fn writer_is_free(&self) -> bool {
        self.writer.try_lock().is_ok()
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn insert_file(&self, creator_id: Uuid, file_type: FileType) -> File {
        let file = File::new(file_type);
        self.committed.lock().unwrap().files.insert(
            file.id,
            FileRecord {
                file: file.clone(),
                creator_id,
            },
        );
        file
    }

    /// Inserts a resource together with its backing file.
    pub fn insert_resource(
        &self,
        creator_id: Uuid,
        name: &str,
        resource_type: ResourceType,
    ) -> Resource {
        let file_type = match resource_type {
            ResourceType::Image => FileType::Png,
            ResourceType::Other => FileType::Other,
        };
        let file = self.insert_file(creator_id, file_type);
        let resource = Resource::new(name, resource_type, "");

        self.committed.lock().unwrap().resources.insert(
            resource.id,
            StoredResource {
                resource: resource.clone(),
                file_id: file.id,
            },
        );
        resource
    }

    pub fn insert_group(
        &self,
        group: &Group,
        main_resource_id: Uuid,
        member_ids: &[Uuid],
        administrator_ids: &[Uuid],
    ) {
        let mut state = self.committed.lock().unwrap();
        state.groups.insert(
            group.id,
            StoredGroup {
                group: group.clone(),
                main_resource_id,
            },
        );
        state
            .members
            .extend(member_ids.iter().map(|r| (group.id, *r)));
        state
            .administrators
            .extend(administrator_ids.iter().map(|u| (group.id, *u)));
    }

    pub fn add_administrator(&self, group_id: Uuid, user_id: Uuid) {
        self.committed
            .lock()
            .unwrap()
            .administrators
            .push((group_id, user_id));
    }

    pub fn group(&self, group_id: Uuid) -> Option<Group> {
        self.committed
            .lock()
            .unwrap()
            .groups
            .get(&group_id)
            .map(|g| g.group.clone())
    }

    pub fn main_resource_id(&self, group_id: Uuid) -> Option<Uuid> {
        self.committed
            .lock()
            .unwrap()
            .groups
            .get(&group_id)
            .map(|g| g.main_resource_id)
    }

    pub fn member_ids(&self, group_id: Uuid) -> Vec<Uuid> {
        self.committed.lock().unwrap().member_ids(group_id)
    }

    pub fn administrator_ids(&self, group_id: Uuid) -> Vec<Uuid> {
        self.committed.lock().unwrap().administrator_ids(group_id)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let writer = Arc::clone(&self.writer).lock_owned().await;

        Ok(MemoryTx {
            state: self.snapshot(),
            journal: Vec::new(),
            _writer: writer,
        })
    }

    async fn commit(&self, tx: MemoryTx) -> Result<()> {
        if self.fail_commit.swap(false, Ordering::SeqCst) {
            anyhow::bail!("Injected commit failure");
        }
        if self.stall_commit.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        *self.committed.lock().unwrap() = tx.state;
        self.journal.lock().unwrap().extend(tx.journal);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> Result<()> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every store over [`MemoryTx`]
pub struct MemoryStore;

fn page<T>(items: Vec<T>, limit: Option<i64>, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(usize::try_from(limit.max(0)).unwrap_or(0)).collect(),
        None => iter.collect(),
    }
}

#[async_trait]
impl FileStore<MemoryTx> for MemoryStore {
    async fn save_file(&self, tx: &mut MemoryTx, creator_id: Uuid, file: &File) -> Result<()> {
        if tx.state.files.contains_key(&file.id) {
            anyhow::bail!("Duplicate file {}", file.id);
        }
        tx.state.files.insert(
            file.id,
            FileRecord {
                file: file.clone(),
                creator_id,
            },
        );
        Ok(())
    }

    async fn get_file(
        &self,
        tx: &mut MemoryTx,
        file_id: Uuid,
        _lock: LockMode,
    ) -> Result<Option<FileRecord>> {
        Ok(tx.state.files.get(&file_id).cloned())
    }

    async fn get_file_by_resource_id(
        &self,
        tx: &mut MemoryTx,
        resource_id: Uuid,
    ) -> Result<Option<File>> {
        Ok(tx.state.resource_record(resource_id)?.map(|r| r.file))
    }
}

#[async_trait]
impl ResourceStore<MemoryTx> for MemoryStore {
    async fn save_resource(
        &self,
        tx: &mut MemoryTx,
        file_id: Uuid,
        resource: &Resource,
    ) -> Result<()> {
        if !tx.state.files.contains_key(&file_id) {
            anyhow::bail!("Foreign key violation: file {}", file_id);
        }
        tx.state.resources.insert(
            resource.id,
            StoredResource {
                resource: resource.clone(),
                file_id,
            },
        );
        Ok(())
    }

    async fn get_resource(
        &self,
        tx: &mut MemoryTx,
        resource_id: Uuid,
    ) -> Result<Option<ResourceRecord>> {
        tx.state.resource_record(resource_id)
    }

    async fn get_resources(
        &self,
        tx: &mut MemoryTx,
        query: &ResourceQuery,
    ) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        for id in tx.state.resources.keys() {
            if let Some(record) = tx.state.resource_record(*id)? {
                records.push(record);
            }
        }

        records.retain(|r| {
            (query.resource_types.is_empty()
                || query.resource_types.contains(&r.resource.resource_type))
                && (query.creator_ids.is_empty() || query.creator_ids.contains(&r.creator_id))
                && (query.group_ids.is_empty()
                    || tx
                        .state
                        .members
                        .iter()
                        .any(|(g, m)| *m == r.resource.id && query.group_ids.contains(g)))
        });
        records.sort_by(|a, b| {
            b.resource
                .created_at
                .cmp(&a.resource.created_at)
                .then(a.resource.id.cmp(&b.resource.id))
        });

        Ok(page(records, query.limit, query.offset))
    }

    async fn get_resources_by_ids(
        &self,
        tx: &mut MemoryTx,
        ids: &[Uuid],
        _lock: LockMode,
    ) -> Result<Vec<Resource>> {
        Ok(ids
            .iter()
            .filter_map(|id| tx.state.resources.get(id))
            .map(|stored| stored.resource.clone())
            .collect())
    }
}

#[async_trait]
impl GroupStore<MemoryTx> for MemoryStore {
    async fn save_group(
        &self,
        tx: &mut MemoryTx,
        group: &Group,
        main_resource_id: Uuid,
    ) -> Result<()> {
        if !tx.state.resources.contains_key(&main_resource_id) {
            anyhow::bail!("Foreign key violation: resource {}", main_resource_id);
        }
        tx.state.groups.insert(
            group.id,
            StoredGroup {
                group: group.clone(),
                main_resource_id,
            },
        );
        Ok(())
    }

    async fn edit_group(
        &self,
        tx: &mut MemoryTx,
        group: &Group,
        main_resource_id: Uuid,
    ) -> Result<u64> {
        match tx.state.groups.get_mut(&group.id) {
            Some(stored) => {
                stored.group = group.clone();
                stored.main_resource_id = main_resource_id;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_group(&self, tx: &mut MemoryTx, group_id: Uuid) -> Result<()> {
        tx.state.groups.remove(&group_id);
        tx.state.members.retain(|(g, _)| *g != group_id);
        tx.state.administrators.retain(|(g, _)| *g != group_id);
        Ok(())
    }

    async fn add_resources(
        &self,
        tx: &mut MemoryTx,
        group_id: Uuid,
        resource_ids: &[Uuid],
    ) -> Result<()> {
        for resource_id in resource_ids {
            if tx.state.members.contains(&(group_id, *resource_id)) {
                anyhow::bail!("Duplicate membership ({}, {})", group_id, resource_id);
            }
            tx.state.members.push((group_id, *resource_id));
            tx.journal.push(MembershipWrite::Added {
                group_id,
                resource_id: *resource_id,
            });
        }
        Ok(())
    }

    async fn delete_resources(
        &self,
        tx: &mut MemoryTx,
        group_id: Uuid,
        resource_ids: &[Uuid],
    ) -> Result<()> {
        for resource_id in resource_ids {
            tx.state
                .members
                .retain(|(g, r)| !(*g == group_id && r == resource_id));
            tx.journal.push(MembershipWrite::Removed {
                group_id,
                resource_id: *resource_id,
            });
        }
        Ok(())
    }

    async fn get_group(
        &self,
        tx: &mut MemoryTx,
        group_id: Uuid,
        _lock: LockMode,
    ) -> Result<Option<GroupRecord>> {
        tx.state.group_record(group_id)
    }

    async fn get_member_ids(&self, tx: &mut MemoryTx, group_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(tx.state.member_ids(group_id))
    }

    async fn get_groups(&self, tx: &mut MemoryTx, query: &GroupQuery) -> Result<Vec<GroupRecord>> {
        let mut records = Vec::new();
        for id in tx.state.groups.keys() {
            if let Some(record) = tx.state.group_record(*id)? {
                records.push(record);
            }
        }

        records.retain(|r| {
            (query.group_types.is_empty() || query.group_types.contains(&r.group.group_type))
                && (query.creator_ids.is_empty()
                    || query.creator_ids.contains(&r.main_resource.creator_id))
        });
        records.sort_by(|a, b| {
            b.group
                .created_at
                .cmp(&a.group.created_at)
                .then(a.group.id.cmp(&b.group.id))
        });

        Ok(page(records, query.limit, query.offset))
    }
}

#[async_trait]
impl AdministratorStore<MemoryTx> for MemoryStore {
    async fn save_administrators(
        &self,
        tx: &mut MemoryTx,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<()> {
        for user_id in user_ids {
            if !tx.state.administrators.contains(&(group_id, *user_id)) {
                tx.state.administrators.push((group_id, *user_id));
            }
        }
        Ok(())
    }

    async fn get_administrators(&self, tx: &mut MemoryTx, group_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(tx.state.administrator_ids(group_id))
    }
}
