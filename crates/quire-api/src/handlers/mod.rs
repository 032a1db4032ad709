//! HTTP handlers, one module per resource collection.

pub mod files;
pub mod groups;
pub mod health;
pub mod resources;
pub mod users;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use quire_core::AppError;
use quire_services::FileDownload;
use std::str::FromStr;

/// Splits a comma-separated query value into parsed items, skipping blanks.
pub(crate) fn parse_list<T>(value: Option<&str>, field: &str) -> Result<Vec<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|e| AppError::InvalidInput(format!("Invalid {} '{}': {}", field, item, e)))
        })
        .collect()
}

pub(crate) fn validate_paging(limit: Option<i64>, offset: Option<i64>) -> Result<i64, AppError> {
    if matches!(limit, Some(limit) if limit < 0) {
        return Err(AppError::InvalidInput("limit must not be negative".to_string()));
    }
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::InvalidInput("offset must not be negative".to_string()));
    }
    Ok(offset)
}

/// Raw file bytes with the content type recorded at upload.
pub(crate) fn file_response(download: FileDownload) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, download.file.file_type.mime_type()),
            (header::CACHE_CONTROL, "private, max-age=31536000, immutable"),
        ],
        download.data,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::models::ResourceType;
    use uuid::Uuid;

    #[test]
    fn test_parse_list_splits_and_trims() {
        let types: Vec<ResourceType> = parse_list(Some("image, other,,"), "type").unwrap();
        assert_eq!(types, vec![ResourceType::Image, ResourceType::Other]);

        let none: Vec<Uuid> = parse_list(None, "group").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_parse_list_rejects_unknown_value() {
        let result: Result<Vec<ResourceType>, _> = parse_list(Some("image,video"), "type");
        assert!(matches!(result, Err(AppError::InvalidInput(msg)) if msg.contains("video")));
    }

    #[test]
    fn test_paging_rejects_negative_values() {
        assert_eq!(validate_paging(Some(10), None).unwrap(), 0);
        assert!(validate_paging(Some(-1), None).is_err());
        assert!(validate_paging(None, Some(-5)).is_err());
    }
}
