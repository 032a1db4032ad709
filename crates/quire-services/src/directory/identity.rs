//! HTTP client for the external identity service.

use anyhow::Context;
use async_trait::async_trait;
use quire_core::models::{Session, UserInfo, UserStatus};
use quire_core::Config;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use super::{DirectoryError, UserDirectory};

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: Uuid,
    name: String,
    state: i32,
}

impl IdentityUser {
    fn into_user_info(self) -> Option<UserInfo> {
        match UserStatus::from_state(self.state) {
            Some(status) => Some(UserInfo::new(self.id, self.name, status)),
            None => {
                tracing::warn!(user.id = %self.id, state = self.state, "Unknown user state from identity service");
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct IdentityServiceClient {
    base_url: String,
    client: reqwest::Client,
}

impl IdentityServiceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.identity_base_url.clone(), config.identity_timeout())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
    ) -> Result<T, DirectoryError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(format!("GET {}: {}", path, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DirectoryError::InvalidSession);
        }
        if status.is_server_error() {
            return Err(DirectoryError::Unavailable(format!(
                "GET {} returned {}",
                path, status
            )));
        }
        if !status.is_success() {
            return Err(DirectoryError::Unexpected(anyhow::anyhow!(
                "GET {} returned {}",
                path,
                status
            )));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode response of GET {}", path))
            .map_err(DirectoryError::Unexpected)
    }
}

#[async_trait]
impl UserDirectory for IdentityServiceClient {
    #[tracing::instrument(skip(self, session))]
    async fn get_me(&self, session: &Session) -> Result<UserInfo, DirectoryError> {
        let user: IdentityUser = self.get_json(session, "/users/me").await?;
        let id = user.id;

        user.into_user_info().ok_or_else(|| {
            DirectoryError::Unexpected(anyhow::anyhow!("User {} has an unknown state", id))
        })
    }

    #[tracing::instrument(skip(self, session))]
    async fn get_all_active_users(
        &self,
        session: &Session,
    ) -> Result<Vec<UserInfo>, DirectoryError> {
        let users: Vec<IdentityUser> = self
            .get_json(session, "/users?include-suspended=true")
            .await?;

        let active: Vec<UserInfo> = users
            .into_iter()
            .filter_map(IdentityUser::into_user_info)
            .filter(UserInfo::is_active)
            .collect();

        tracing::debug!(count = active.len(), "Fetched active users");
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    fn session() -> Session {
        Session::new("tok", Utc::now() + ChronoDuration::hours(1))
    }

    fn client(server: &mockito::Server) -> IdentityServiceClient {
        IdentityServiceClient::new(server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_me_sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let id = Uuid::new_v4();
        let mock = server
            .mock("GET", "/users/me")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"id":"{}","name":"alice","state":1}}"#, id))
            .create_async()
            .await;

        let me = client(&server).get_me(&session()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(me, UserInfo::new(id, "alice", UserStatus::Active));
    }

    #[tokio::test]
    async fn test_unauthorized_is_invalid_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me")
            .with_status(401)
            .create_async()
            .await;

        let result = client(&server).get_me(&session()).await;
        assert!(matches!(result, Err(DirectoryError::InvalidSession)));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me")
            .with_status(503)
            .create_async()
            .await;

        let result = client(&server).get_me(&session()).await;
        assert!(matches!(result, Err(DirectoryError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_active_users_filters_by_state() {
        let mut server = mockito::Server::new_async().await;
        let active = Uuid::new_v4();
        let body = format!(
            r#"[
                {{"id":"{}","name":"alice","state":1}},
                {{"id":"{}","name":"bob","state":2}},
                {{"id":"{}","name":"carol","state":0}},
                {{"id":"{}","name":"dave","state":9}}
            ]"#,
            active,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        server
            .mock("GET", "/users")
            .match_query(mockito::Matcher::UrlEncoded(
                "include-suspended".into(),
                "true".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let users = client(&server)
            .get_all_active_users(&session())
            .await
            .unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, active);
        assert_eq!(users[0].name, "alice");
    }

    #[tokio::test]
    async fn test_malformed_body_is_unexpected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result = client(&server).get_me(&session()).await;
        assert!(matches!(result, Err(DirectoryError::Unexpected(_))));
    }
}
