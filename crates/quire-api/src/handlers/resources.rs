use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quire_core::models::{CreateResourceRequest, ResourceInfo, ResourceSearchParams};
use quire_db::Database;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;
use uuid::Uuid;

use super::{file_response, parse_list, validate_paging};
use crate::auth::AuthSession;
use crate::error::{ApiJson, ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Filters for listing resources. List values are comma separated.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResourceListQuery {
    /// Resource types, e.g. `image,other`
    #[serde(rename = "type")]
    pub resource_type: Option<String>,
    /// Display names of creators
    pub user: Option<String>,
    /// IDs of groups the resources belong to
    pub group: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ResourceListQuery {
    fn search_params(self) -> Result<ResourceSearchParams, HttpAppError> {
        let offset = validate_paging(self.limit, self.offset)?;
        Ok(ResourceSearchParams {
            resource_types: parse_list(self.resource_type.as_deref(), "resource type")?,
            users: parse_list(self.user.as_deref(), "user")?,
            groups: parse_list(self.group.as_deref(), "group")?,
            limit: self.limit,
            offset,
        })
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/resources",
    tag = "resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Resource created", body = ResourceInfo),
        (status = 400, description = "Invalid input or resource type", body = ErrorResponse),
        (status = 403, description = "File belongs to another user", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, session, request),
    fields(file.id = %request.file_id, resource.resource_type = %request.resource_type)
)]
pub async fn create_resource<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    ApiJson(request): ApiJson<CreateResourceRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let info = state.resources.create_resource(&session, request).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

#[utoipa::path(
    get,
    path = "/api/v1/resources",
    tag = "resources",
    params(ResourceListQuery),
    responses(
        (status = 200, description = "Matching resources, newest first", body = Vec<ResourceInfo>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 404, description = "Unknown user filter", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session))]
pub async fn list_resources<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Query(query): Query<ResourceListQuery>,
) -> Result<Json<Vec<ResourceInfo>>, HttpAppError> {
    let params = query.search_params()?;
    Ok(Json(state.resources.get_resources(&session, &params).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/resources/{id}",
    tag = "resources",
    params(("id" = Uuid, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource found", body = ResourceInfo),
        (status = 404, description = "Resource or its creator not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(resource.id = %id))]
pub async fn get_resource<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Json<ResourceInfo>, HttpAppError> {
    Ok(Json(state.resources.get_resource(&session, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/resources/{id}/file",
    tag = "resources",
    params(("id" = Uuid, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Backing file bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Resource not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(resource.id = %id))]
pub async fn download_resource_file<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    state.users.me(&session).await?;
    let download = state.resources.download_resource_file(id).await?;
    Ok(file_response(download))
}
