use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use quire_core::models::{
    AddResourceRequest, GroupDetail, GroupInfo, GroupRequest, GroupSearchParams, ResourceInfo,
};
use quire_db::Database;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use super::{parse_list, validate_paging};
use crate::auth::AuthSession;
use crate::error::{ApiJson, ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Filters for listing groups. List values are comma separated.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GroupListQuery {
    /// Group types, e.g. `art_book,other`
    #[serde(rename = "type")]
    pub group_type: Option<String>,
    /// Display names of main-resource creators
    pub user: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl GroupListQuery {
    fn search_params(self) -> Result<GroupSearchParams, HttpAppError> {
        let offset = validate_paging(self.limit, self.offset)?;
        Ok(GroupSearchParams {
            group_types: parse_list(self.group_type.as_deref(), "group type")?,
            users: parse_list(self.user.as_deref(), "user")?,
            limit: self.limit,
            offset,
        })
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/groups",
    tag = "groups",
    request_body = GroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupDetail),
        (status = 400, description = "Invalid input or permission combination", body = ErrorResponse),
        (status = 401, description = "Missing or unknown session", body = ErrorResponse),
        (status = 404, description = "Main or member resource not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(group.name = %request.name, member_count = request.resource_ids.len())
)]
pub async fn create_group<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    ApiJson(request): ApiJson<GroupRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let detail = state.groups.create_group(&session, request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups",
    tag = "groups",
    params(GroupListQuery),
    responses(
        (status = 200, description = "Matching groups, newest first", body = Vec<GroupInfo>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 404, description = "Unknown user filter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session))]
pub async fn list_groups<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Query(query): Query<GroupListQuery>,
) -> Result<Json<Vec<GroupInfo>>, HttpAppError> {
    let params = query.search_params()?;
    let groups = state.groups.get_groups(&session, &params).await?;
    Ok(Json(groups))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group found", body = GroupDetail),
        (status = 403, description = "Private group and caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(group.id = %id))]
pub async fn get_group<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupDetail>, HttpAppError> {
    Ok(Json(state.groups.get_group(&session, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/groups/{id}",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = GroupRequest,
    responses(
        (status = 200, description = "Group updated", body = GroupDetail),
        (status = 400, description = "Invalid input or permission combination", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Group or resource not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session, request), fields(group.id = %id))]
pub async fn edit_group<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<GroupRequest>,
) -> Result<Json<GroupDetail>, HttpAppError> {
    Ok(Json(state.groups.edit_group(&session, id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(group.id = %id))]
pub async fn delete_group<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    state.groups.delete_group(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/resources",
    tag = "groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = AddResourceRequest,
    responses(
        (status = 201, description = "Resource added; the new member first", body = Vec<ResourceInfo>),
        (status = 403, description = "Group is privately writable and caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Group or resource not found", body = ErrorResponse),
        (status = 409, description = "Resource is already a member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(group.id = %id, resource.id = %request.resource_id)
)]
pub async fn add_resource<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<AddResourceRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let members = state
        .groups
        .add_resource(&session, id, request.resource_id)
        .await?;
    Ok((StatusCode::CREATED, Json(members)))
}
