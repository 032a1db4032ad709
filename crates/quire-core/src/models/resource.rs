use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::impl_lookup_display;
use crate::lookup::LookupEnum;
use crate::models::{File, FileType, UserInfo};

/// Kind of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Image,
    Other,
}

impl LookupEnum for ResourceType {
    const TABLE: &'static str = "resource_types";
    const ALL: &'static [Self] = &[ResourceType::Image, ResourceType::Other];

    fn as_db_name(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Other => "other",
        }
    }
}

impl_lookup_display!(ResourceType);

impl ResourceType {
    /// Whether a file of `file_type` may back a resource of this type.
    pub fn accepts(&self, file_type: FileType) -> bool {
        match self {
            ResourceType::Image => file_type.is_image(),
            ResourceType::Other => true,
        }
    }
}

/// A named, typed wrapper around exactly one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub resource_type: ResourceType,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        resource_type: ResourceType,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            resource_type,
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }
}

/// Resource with its backing file and resolved creator
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceInfo {
    #[serde(flatten)]
    pub resource: Resource,
    pub file: File,
    pub creator: UserInfo,
}

/// Request DTO for wrapping an uploaded file into a resource
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateResourceRequest {
    pub file_id: Uuid,
    #[validate(length(
        min = 1,
        max = 64,
        message = "Resource name must be between 1 and 64 characters"
    ))]
    pub name: String,
    pub resource_type: ResourceType,
    #[serde(default)]
    #[validate(length(max = 400, message = "Comment must be at most 400 characters"))]
    pub comment: String,
}

/// Filters for listing resources. Users are given by display name.
#[derive(Debug, Clone, Default)]
pub struct ResourceSearchParams {
    pub resource_types: Vec<ResourceType>,
    pub users: Vec<String>,
    pub groups: Vec<Uuid>,
    /// `None` lists everything.
    pub limit: Option<i64>,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_resources_need_image_files() {
        for file_type in [
            FileType::Jpeg,
            FileType::Png,
            FileType::Webp,
            FileType::Svg,
            FileType::Gif,
        ] {
            assert!(ResourceType::Image.accepts(file_type));
        }
        assert!(!ResourceType::Image.accepts(FileType::Other));
    }

    #[test]
    fn test_other_resources_accept_any_file() {
        for file_type in FileType::ALL {
            assert!(ResourceType::Other.accepts(*file_type));
        }
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateResourceRequest {
            file_id: Uuid::new_v4(),
            name: String::new(),
            resource_type: ResourceType::Image,
            comment: String::new(),
        };
        assert!(request.validate().is_err());

        let request = CreateResourceRequest {
            name: "cover".to_string(),
            comment: "x".repeat(401),
            ..request
        };
        assert!(request.validate().is_err());

        let request = CreateResourceRequest {
            comment: "x".repeat(400),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
