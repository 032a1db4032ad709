//! User directory
//!
//! Users live in an external identity service. [`UserDirectory`] is the seam
//! the orchestrators consume; [`IdentityServiceClient`] talks to the service
//! over HTTP and [`CachedUserDirectory`] wraps any directory with the
//! per-session and roster caches.

mod cache;
mod identity;

pub use cache::CachedUserDirectory;
pub use identity::IdentityServiceClient;

use async_trait::async_trait;
use quire_core::models::{Session, UserInfo};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The session's access token was rejected or has expired
    #[error("Invalid or expired session")]
    InvalidSession,

    /// The identity service could not be reached or answered with a server error
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// The user the session belongs to
    async fn get_me(&self, session: &Session) -> Result<UserInfo, DirectoryError>;

    /// Every currently active member
    async fn get_all_active_users(&self, session: &Session)
        -> Result<Vec<UserInfo>, DirectoryError>;
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for Arc<T> {
    async fn get_me(&self, session: &Session) -> Result<UserInfo, DirectoryError> {
        (**self).get_me(session).await
    }

    async fn get_all_active_users(
        &self,
        session: &Session,
    ) -> Result<Vec<UserInfo>, DirectoryError> {
        (**self).get_all_active_users(session).await
    }
}
