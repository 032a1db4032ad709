use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Membership status reported by the identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Deactivated,
    Active,
    Suspended,
}

impl UserStatus {
    /// Maps the numeric `state` field of the identity service.
    pub fn from_state(state: i32) -> Option<Self> {
        match state {
            0 => Some(UserStatus::Deactivated),
            1 => Some(UserStatus::Active),
            2 => Some(UserStatus::Suspended),
            _ => None,
        }
    }
}

/// A user identity as known to the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub status: UserStatus,
}

impl UserInfo {
    pub fn new(id: Uuid, name: impl Into<String>, status: UserStatus) -> Self {
        Self {
            id,
            name: name.into(),
            status,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// An authenticated session: the identity provider access token and the
/// instant after which it must no longer be used.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Session valid for `lifetime` from now.
    pub fn with_lifetime(access_token: impl Into<String>, lifetime: Duration) -> Self {
        Self::new(access_token, Utc::now() + lifetime)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Time left before expiry, `None` once expired.
    pub fn remaining(&self) -> Option<std::time::Duration> {
        (self.expires_at - Utc::now()).to_std().ok()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_state() {
        assert_eq!(UserStatus::from_state(0), Some(UserStatus::Deactivated));
        assert_eq!(UserStatus::from_state(1), Some(UserStatus::Active));
        assert_eq!(UserStatus::from_state(2), Some(UserStatus::Suspended));
        assert_eq!(UserStatus::from_state(7), None);
    }

    #[test]
    fn test_session_expiry() {
        let live = Session::with_lifetime("token", Duration::minutes(5));
        assert!(!live.is_expired());
        assert!(live.remaining().is_some());

        let stale = Session::new("token", Utc::now() - Duration::seconds(1));
        assert!(stale.is_expired());
        assert!(stale.remaining().is_none());
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session::with_lifetime("super-secret", Duration::minutes(5));
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("super-secret"));
    }
}
