use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use quire_core::models::FileInfo;
use quire_core::AppError;
use quire_db::Database;
use std::sync::Arc;
use uuid::Uuid;

use super::file_response;
use crate::auth::AuthSession;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Reads the single `file` field of a multipart form.
async fn extract_multipart_file(mut multipart: Multipart) -> Result<Bytes, AppError> {
    let mut file_data: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if file_data.is_some() {
            return Err(AppError::InvalidInput(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;
        file_data = Some(data);
    }

    file_data.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// Upload a file
///
/// Accepts either a multipart form with one `file` field or the raw bytes as
/// the request body. The content type is sniffed from the bytes.
#[utoipa::path(
    post,
    path = "/api/v1/files",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = FileInfo),
        (status = 400, description = "Empty or unreadable upload", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session, request))]
pub async fn upload_file<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    request: Request,
) -> Result<impl IntoResponse, HttpAppError> {
    let data = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::InvalidInput(format!("Invalid multipart request: {}", e)))?;
        extract_multipart_file(multipart).await?
    } else {
        Bytes::from_request(request, &state)
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read request body: {}", e)))?
    };

    tracing::debug!(size = data.len(), "Received upload");
    let info = state.files.upload(&session, data).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File bytes", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, session), fields(file.id = %id))]
pub async fn download_file<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    AuthSession(session): AuthSession,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    state.users.me(&session).await?;
    let download = state.files.download(id).await?;
    Ok(file_response(download))
}
