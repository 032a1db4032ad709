//! Test fixtures

use quire_core::models::{
    GroupRequest, GroupType, ReadPermission, Session, UserInfo, WritePermission,
};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{MemoryDatabase, MockStorage, StaticDirectory};
use crate::directory::{CachedUserDirectory, UserDirectory};
use crate::roster::UserResolver;
use crate::{FileService, GroupService, ResourceService};

pub const TEST_MAX_FILE_SIZE: usize = 1024 * 1024;

/// The three orchestrators wired to in-memory collaborators
pub struct TestContext {
    pub db: Arc<MemoryDatabase>,
    pub directory: Arc<StaticDirectory>,
    pub storage: Arc<MockStorage>,
    pub users: UserResolver,
    pub groups: GroupService<MemoryDatabase>,
    pub resources: ResourceService<MemoryDatabase>,
    pub files: FileService<MemoryDatabase>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::build(|directory| Arc::clone(directory) as Arc<dyn UserDirectory>)
    }

    /// Same services, resolving users through a [`CachedUserDirectory`]
    pub fn with_cached_directory() -> Self {
        Self::build(|directory| {
            Arc::new(CachedUserDirectory::new(
                Arc::clone(directory),
                NonZeroUsize::new(16).unwrap(),
                Duration::from_secs(60),
            )) as Arc<dyn UserDirectory>
        })
    }

    fn build(
        wrap: impl FnOnce(&Arc<StaticDirectory>) -> Arc<dyn UserDirectory>,
    ) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let directory = Arc::new(StaticDirectory::new());
        let storage = Arc::new(MockStorage::new());

        let users = UserResolver::new(wrap(&directory));
        let stores = MemoryDatabase::stores();

        Self {
            groups: GroupService::new(Arc::clone(&db), stores.clone(), users.clone()),
            resources: ResourceService::new(
                Arc::clone(&db),
                stores.clone(),
                users.clone(),
                storage.clone(),
            ),
            files: FileService::new(
                Arc::clone(&db),
                stores,
                users.clone(),
                storage.clone(),
                TEST_MAX_FILE_SIZE,
            ),
            users,
            db,
            directory,
            storage,
        }
    }

    /// An active user and their session
    pub fn user(&self, name: &str) -> (UserInfo, Session) {
        self.directory.add_user(name)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Publicly readable, privately writable art book
pub fn group_request(name: &str, main_resource_id: Uuid, resource_ids: Vec<Uuid>) -> GroupRequest {
    GroupRequest {
        name: name.to_string(),
        group_type: GroupType::ArtBook,
        description: String::new(),
        read_permission: ReadPermission::Public,
        write_permission: WritePermission::Private,
        main_resource_id,
        resource_ids,
    }
}
