//! Bearer session extraction
//!
//! The identity provider issues the access token; this service only forwards
//! it. A request carrying `Authorization: Bearer <token>` becomes a
//! [`Session`] that expires after the configured lifetime.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};
use quire_core::models::Session;
use quire_core::AppError;

use crate::error::HttpAppError;

/// How long a session built from a bearer token stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLifetime(pub chrono::Duration);

/// The caller's session, extracted from the `Authorization` header
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed Authorization header".to_string()))?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("Malformed Authorization header".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized(format!(
            "Unsupported authorization scheme '{}'",
            scheme
        )));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized("Empty bearer token".to_string()));
    }

    Ok(token)
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    SessionLifetime: FromRef<S>,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let SessionLifetime(lifetime) = SessionLifetime::from_ref(state);
        Ok(AuthSession(Session::with_lifetime(token, lifetime)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    async fn extract(authorization: Option<&str>) -> Result<AuthSession, HttpAppError> {
        let mut builder = Request::builder().uri("/api/v1/groups");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        let lifetime = SessionLifetime(chrono::Duration::minutes(30));
        AuthSession::from_request_parts(&mut parts, &lifetime).await
    }

    #[tokio::test]
    async fn test_bearer_token_becomes_session() {
        let AuthSession(session) = extract(Some("Bearer abc.def")).await.unwrap();

        assert_eq!(session.access_token, "abc.def");
        let remaining = session.remaining().unwrap();
        assert!(remaining <= std::time::Duration::from_secs(30 * 60));
        assert!(remaining > std::time::Duration::from_secs(29 * 60));
    }

    #[tokio::test]
    async fn test_scheme_is_case_insensitive() {
        let AuthSession(session) = extract(Some("bearer token-1")).await.unwrap();
        assert_eq!(session.access_token, "token-1");
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header_is_unauthorized() {
        for header in [None, Some("Basic dXNlcjpwdw=="), Some("Bearer "), Some("token")] {
            let err = extract(header).await.unwrap_err();
            assert!(matches!(err.0, AppError::Unauthorized(_)), "{header:?}");
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
