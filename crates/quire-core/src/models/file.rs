use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::impl_lookup_display;
use crate::lookup::LookupEnum;
use crate::models::UserInfo;

/// Content type of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Jpeg,
    Png,
    Webp,
    Svg,
    Gif,
    Other,
}

impl LookupEnum for FileType {
    const TABLE: &'static str = "file_types";
    const ALL: &'static [Self] = &[
        FileType::Jpeg,
        FileType::Png,
        FileType::Webp,
        FileType::Svg,
        FileType::Gif,
        FileType::Other,
    ];

    fn as_db_name(&self) -> &'static str {
        match self {
            FileType::Jpeg => "jpeg",
            FileType::Png => "png",
            FileType::Webp => "webp",
            FileType::Svg => "svg",
            FileType::Gif => "gif",
            FileType::Other => "other",
        }
    }
}

impl_lookup_display!(FileType);

impl FileType {
    /// Whether the content can be rendered as an image.
    pub fn is_image(&self) -> bool {
        !matches!(self, FileType::Other)
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FileType::Jpeg => "image/jpeg",
            FileType::Png => "image/png",
            FileType::Webp => "image/webp",
            FileType::Svg => "image/svg+xml",
            FileType::Gif => "image/gif",
            FileType::Other => "application/octet-stream",
        }
    }
}

/// An uploaded file. The creator is tracked by the file store, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct File {
    pub id: Uuid,
    pub file_type: FileType,
    pub created_at: DateTime<Utc>,
}

impl File {
    pub fn new(file_type: FileType) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_type,
            created_at: Utc::now(),
        }
    }
}

/// File together with its resolved creator
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileInfo {
    #[serde(flatten)]
    pub file: File,
    pub creator: UserInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_other_is_not_an_image() {
        for file_type in FileType::ALL {
            assert_eq!(file_type.is_image(), *file_type != FileType::Other);
        }
    }

    #[test]
    fn test_file_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&FileType::Webp).unwrap(), "\"webp\"");
    }
}
