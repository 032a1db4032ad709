//! Fixed user directory for testing

use async_trait::async_trait;
use chrono::{Duration, Utc};
use quire_core::models::{Session, UserInfo, UserStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::directory::{DirectoryError, UserDirectory};

/// Directory whose users and sessions are set up by the test
#[derive(Default)]
pub struct StaticDirectory {
    users: Mutex<Vec<UserInfo>>,
    sessions: Mutex<HashMap<String, Uuid>>,
    unavailable: AtomicBool,
    roster_calls: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active user and returns a session for them.
    pub fn add_user(&self, name: &str) -> (UserInfo, Session) {
        let user = UserInfo::new(Uuid::new_v4(), name, UserStatus::Active);
        let session = Session::new(
            format!("token-{}", user.id),
            Utc::now() + Duration::hours(1),
        );

        self.users.lock().unwrap().push(user.clone());
        self.sessions
            .lock()
            .unwrap()
            .insert(session.access_token.clone(), user.id);

        (user, session)
    }

    pub fn set_status(&self, user_id: Uuid, status: UserStatus) {
        if let Some(user) = self
            .users
            .lock()
            .unwrap()
            .iter_mut()
            .find(|u| u.id == user_id)
        {
            user.status = status;
        }
    }

    /// Makes every call fail as if the identity service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn roster_calls(&self) -> usize {
        self.roster_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn session_user(&self, session: &Session) -> Result<Uuid, DirectoryError> {
        self.sessions
            .lock()
            .unwrap()
            .get(&session.access_token)
            .copied()
            .ok_or(DirectoryError::InvalidSession)
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn get_me(&self, session: &Session) -> Result<UserInfo, DirectoryError> {
        self.check_available()?;

        let user_id = self.session_user(session)?;

        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(DirectoryError::InvalidSession)
    }

    async fn get_all_active_users(
        &self,
        session: &Session,
    ) -> Result<Vec<UserInfo>, DirectoryError> {
        self.check_available()?;
        self.session_user(session)?;
        self.roster_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.is_active())
            .cloned()
            .collect())
    }
}
