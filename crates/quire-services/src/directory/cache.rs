//! Caching decorator for a [`UserDirectory`].
//!
//! The current-user lookup is cached per access token for as long as the
//! session stays valid. The active-user roster is shared by every session and
//! refreshed after a fixed TTL, capped at one hour. It is only handed to a
//! session that resolves through the current-user lookup first.

use async_trait::async_trait;
use lru::LruCache;
use quire_core::config::MAX_ROSTER_CACHE_TTL_SECS;
use quire_core::models::{Session, UserInfo};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{DirectoryError, UserDirectory};

struct Cached<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> Cached<T> {
    fn fresh(&self) -> Option<T> {
        (Instant::now() < self.expires_at).then(|| self.value.clone())
    }
}

pub struct CachedUserDirectory<D> {
    inner: D,
    me_cache: Mutex<LruCache<String, Cached<UserInfo>>>,
    roster: Mutex<Option<Cached<Vec<UserInfo>>>>,
    roster_ttl: Duration,
}

impl<D: UserDirectory> CachedUserDirectory<D> {
    pub fn new(inner: D, session_capacity: NonZeroUsize, roster_ttl: Duration) -> Self {
        let roster_ttl = roster_ttl.min(Duration::from_secs(MAX_ROSTER_CACHE_TTL_SECS));

        Self {
            inner,
            me_cache: Mutex::new(LruCache::new(session_capacity)),
            roster: Mutex::new(None),
            roster_ttl,
        }
    }

    /// Drops every cached entry.
    pub async fn invalidate(&self) {
        self.me_cache.lock().await.clear();
        *self.roster.lock().await = None;
    }
}

#[async_trait]
impl<D: UserDirectory> UserDirectory for CachedUserDirectory<D> {
    async fn get_me(&self, session: &Session) -> Result<UserInfo, DirectoryError> {
        if let Some(user) = self
            .me_cache
            .lock()
            .await
            .get(&session.access_token)
            .and_then(Cached::fresh)
        {
            return Ok(user);
        }

        let user = self.inner.get_me(session).await?;

        // An already expired session is answered but never cached.
        if let Some(remaining) = session.remaining() {
            self.me_cache.lock().await.put(
                session.access_token.clone(),
                Cached {
                    value: user.clone(),
                    expires_at: Instant::now() + remaining,
                },
            );
        }

        Ok(user)
    }

    async fn get_all_active_users(
        &self,
        session: &Session,
    ) -> Result<Vec<UserInfo>, DirectoryError> {
        self.get_me(session).await?;

        let mut roster = self.roster.lock().await;

        if let Some(users) = roster.as_ref().and_then(Cached::fresh) {
            return Ok(users);
        }

        // Held across the fetch so concurrent misses share one request.
        let users = self.inner.get_all_active_users(session).await?;
        *roster = Some(Cached {
            value: users.clone(),
            expires_at: Instant::now() + self.roster_ttl,
        });

        tracing::debug!(count = users.len(), "Refreshed user roster cache");
        Ok(users)
    }
}
