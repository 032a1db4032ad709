use axum::{extract::State, Json};
use quire_core::models::UserInfo;
use quire_db::Database;
use std::sync::Arc;

use crate::auth::AuthSession;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "The caller", body = UserInfo),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 404, description = "Session not recognised by the identity service", body = ErrorResponse),
        (status = 502, description = "Identity service unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session))]
pub async fn get_me<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
) -> Result<Json<UserInfo>, HttpAppError> {
    Ok(Json(state.users.me(&session).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Active users of the organization", body = Vec<UserInfo>),
        (status = 401, description = "Missing bearer token", body = ErrorResponse),
        (status = 502, description = "Identity service unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session))]
pub async fn list_users<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
) -> Result<Json<Vec<UserInfo>>, HttpAppError> {
    let roster = state.users.roster(&session).await?;
    Ok(Json(roster.users().to_vec()))
}
