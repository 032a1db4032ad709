//! Identity resolution for the orchestrators.

use quire_core::models::{ResourceInfo, Session, UserInfo};
use quire_core::{AppError, AppResult};
use quire_db::ResourceRecord;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::directory::{DirectoryError, UserDirectory};

/// Snapshot of the active users, indexed by ID and by display name
#[derive(Debug, Clone, Default)]
pub struct Roster {
    users: Vec<UserInfo>,
    by_id: HashMap<Uuid, usize>,
    by_name: HashMap<String, usize>,
}

impl Roster {
    pub fn new(users: Vec<UserInfo>) -> Self {
        let by_id = users.iter().enumerate().map(|(i, u)| (u.id, i)).collect();
        let by_name = users
            .iter()
            .enumerate()
            .map(|(i, u)| (u.name.clone(), i))
            .collect();

        Self {
            users,
            by_id,
            by_name,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&UserInfo> {
        self.by_id.get(&id).map(|&i| &self.users[i])
    }

    /// The active user with `id`, or `NoUser`.
    pub fn resolve(&self, id: Uuid) -> AppResult<&UserInfo> {
        self.get(id)
            .ok_or_else(|| AppError::NoUser(format!("User {} is not an active member", id)))
    }

    pub fn resolve_name(&self, name: &str) -> AppResult<&UserInfo> {
        self.by_name
            .get(name)
            .map(|&i| &self.users[i])
            .ok_or_else(|| AppError::NoUser(format!("User '{}' is not an active member", name)))
    }

    /// IDs for a list of display names; the first unknown name fails the call.
    pub fn resolve_names(&self, names: &[String]) -> AppResult<Vec<Uuid>> {
        names
            .iter()
            .map(|name| self.resolve_name(name).map(|u| u.id))
            .collect()
    }

    /// Attaches the resolved creator to a stored resource.
    pub fn resource_info(&self, record: ResourceRecord) -> AppResult<ResourceInfo> {
        let creator = self.resolve(record.creator_id)?.clone();

        Ok(ResourceInfo {
            resource: record.resource,
            file: record.file,
            creator,
        })
    }

    pub fn users(&self) -> &[UserInfo] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Wraps a [`UserDirectory`] and maps its failures onto [`AppError`]
#[derive(Clone)]
pub struct UserResolver {
    directory: Arc<dyn UserDirectory>,
}

impl UserResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    pub async fn me(&self, session: &Session) -> AppResult<UserInfo> {
        self.directory
            .get_me(session)
            .await
            .map_err(|e| directory_error("get current user", e))
    }

    pub async fn roster(&self, session: &Session) -> AppResult<Roster> {
        let users = self
            .directory
            .get_all_active_users(session)
            .await
            .map_err(|e| directory_error("get active users", e))?;

        Ok(Roster::new(users))
    }
}

fn directory_error(operation: &str, err: DirectoryError) -> AppError {
    match err {
        DirectoryError::InvalidSession => {
            AppError::NoUser("Session does not belong to an active user".to_string())
        }
        DirectoryError::Unavailable(msg) => {
            AppError::IdentityProvider(format!("Failed to {}: {}", operation, msg))
        }
        DirectoryError::Unexpected(source) => {
            AppError::IdentityProvider(format!("Failed to {}: {:#}", operation, source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::models::UserStatus;

    fn roster() -> (Roster, Uuid, Uuid) {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let roster = Roster::new(vec![
            UserInfo::new(alice, "alice", UserStatus::Active),
            UserInfo::new(bob, "bob", UserStatus::Active),
        ]);
        (roster, alice, bob)
    }

    #[test]
    fn test_resolve_by_id() {
        let (roster, alice, _) = roster();

        assert_eq!(roster.resolve(alice).unwrap().name, "alice");
        assert!(matches!(
            roster.resolve(Uuid::new_v4()),
            Err(AppError::NoUser(_))
        ));
    }

    #[test]
    fn test_resolve_names_fails_on_first_unknown() {
        let (roster, alice, bob) = roster();

        let ids = roster
            .resolve_names(&["bob".to_string(), "alice".to_string()])
            .unwrap();
        assert_eq!(ids, vec![bob, alice]);

        let result = roster.resolve_names(&["alice".to_string(), "mallory".to_string()]);
        match result {
            Err(AppError::NoUser(msg)) => assert!(msg.contains("mallory")),
            other => panic!("expected NoUser, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_error_mapping() {
        assert!(matches!(
            directory_error("x", DirectoryError::InvalidSession),
            AppError::NoUser(_)
        ));
        assert!(matches!(
            directory_error("x", DirectoryError::Unavailable("down".into())),
            AppError::IdentityProvider(_)
        ));
        assert!(matches!(
            directory_error("x", DirectoryError::Unexpected(anyhow::anyhow!("bad"))),
            AppError::IdentityProvider(_)
        ));
    }
}
