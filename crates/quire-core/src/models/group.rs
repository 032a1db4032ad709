use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::impl_lookup_display;
use crate::lookup::LookupEnum;
use crate::models::{ResourceInfo, UserInfo};

/// Kind of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    ArtBook,
    Other,
}

impl LookupEnum for GroupType {
    const TABLE: &'static str = "group_types";
    const ALL: &'static [Self] = &[GroupType::ArtBook, GroupType::Other];

    fn as_db_name(&self) -> &'static str {
        match self {
            GroupType::ArtBook => "art_book",
            GroupType::Other => "other",
        }
    }
}

impl_lookup_display!(GroupType);

/// Who may read a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadPermission {
    Public,
    Private,
}

impl LookupEnum for ReadPermission {
    const TABLE: &'static str = "read_permissions";
    const ALL: &'static [Self] = &[ReadPermission::Public, ReadPermission::Private];

    fn as_db_name(&self) -> &'static str {
        match self {
            ReadPermission::Public => "public",
            ReadPermission::Private => "private",
        }
    }
}

impl_lookup_display!(ReadPermission);

/// Who may add resources to a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WritePermission {
    Public,
    Private,
}

impl LookupEnum for WritePermission {
    const TABLE: &'static str = "write_permissions";
    const ALL: &'static [Self] = &[WritePermission::Public, WritePermission::Private];

    fn as_db_name(&self) -> &'static str {
        match self {
            WritePermission::Public => "public",
            WritePermission::Private => "private",
        }
    }
}

impl_lookup_display!(WritePermission);

/// Group entity. Main resource, members and administrators are relations
/// kept by the stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub group_type: GroupType,
    pub description: String,
    pub read_permission: ReadPermission,
    pub write_permission: WritePermission,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        group_type: GroupType,
        description: impl Into<String>,
        read_permission: ReadPermission,
        write_permission: WritePermission,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            group_type,
            description: description.into(),
            read_permission,
            write_permission,
            created_at: Utc::now(),
        }
    }

    pub fn from_request(request: &GroupRequest) -> Self {
        Self::new(
            request.name.clone(),
            request.group_type,
            request.description.clone(),
            request.read_permission,
            request.write_permission,
        )
    }

    /// A privately readable group must not be publicly writable.
    pub fn is_valid_permission(&self) -> bool {
        !(self.read_permission == ReadPermission::Private
            && self.write_permission == WritePermission::Public)
    }

    /// Copies the editable fields of `request`, touching only those that
    /// differ. Returns whether anything changed.
    pub fn apply(&mut self, request: &GroupRequest) -> bool {
        let mut changed = false;

        if self.name != request.name {
            self.name = request.name.clone();
            changed = true;
        }
        if self.group_type != request.group_type {
            self.group_type = request.group_type;
            changed = true;
        }
        if self.description != request.description {
            self.description = request.description.clone();
            changed = true;
        }
        if self.read_permission != request.read_permission {
            self.read_permission = request.read_permission;
            changed = true;
        }
        if self.write_permission != request.write_permission {
            self.write_permission = request.write_permission;
            changed = true;
        }

        changed
    }
}

/// Request DTO for creating a group or replacing all its editable state
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct GroupRequest {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Group name must be between 1 and 64 characters"
    ))]
    pub name: String,
    pub group_type: GroupType,
    #[serde(default)]
    #[validate(length(max = 400, message = "Description must be at most 400 characters"))]
    pub description: String,
    pub read_permission: ReadPermission,
    pub write_permission: WritePermission,
    pub main_resource_id: Uuid,
    /// Member resources, excluding the main resource unless listed explicitly
    #[serde(default)]
    pub resource_ids: Vec<Uuid>,
}

/// Request DTO for adding a single resource to a group
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddResourceRequest {
    pub resource_id: Uuid,
}

/// Group with its main resource, as returned by listings
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupInfo {
    #[serde(flatten)]
    pub group: Group,
    pub main_resource: ResourceInfo,
}

/// Group with administrators and main resource
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub administrators: Vec<UserInfo>,
    pub main_resource: ResourceInfo,
}

/// Filters for listing groups. Users are display names of main-resource creators.
#[derive(Debug, Clone, Default)]
pub struct GroupSearchParams {
    pub group_types: Vec<GroupType>,
    pub users: Vec<String>,
    /// `None` lists everything.
    pub limit: Option<i64>,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GroupRequest {
        GroupRequest {
            name: "Book1".to_string(),
            group_type: GroupType::ArtBook,
            description: "sketches".to_string(),
            read_permission: ReadPermission::Public,
            write_permission: WritePermission::Private,
            main_resource_id: Uuid::new_v4(),
            resource_ids: vec![],
        }
    }

    #[test]
    fn test_permission_invariant() {
        let cases = [
            (ReadPermission::Public, WritePermission::Public, true),
            (ReadPermission::Public, WritePermission::Private, true),
            (ReadPermission::Private, WritePermission::Private, true),
            (ReadPermission::Private, WritePermission::Public, false),
        ];

        for (read, write, valid) in cases {
            let group = Group::new("g", GroupType::Other, "", read, write);
            assert_eq!(group.is_valid_permission(), valid, "{read} / {write}");
        }
    }

    #[test]
    fn test_apply_unchanged_request_is_noop() {
        let req = request();
        let mut group = Group::from_request(&req);
        let before = group.clone();

        assert!(!group.apply(&req));
        assert_eq!(group, before);
    }

    #[test]
    fn test_apply_updates_only_differing_fields() {
        let req = request();
        let mut group = Group::from_request(&req);
        let id = group.id;
        let created_at = group.created_at;

        let edited = GroupRequest {
            write_permission: WritePermission::Public,
            ..req
        };
        assert!(group.apply(&edited));
        assert_eq!(group.write_permission, WritePermission::Public);
        assert_eq!(group.name, "Book1");
        assert_eq!(group.id, id);
        assert_eq!(group.created_at, created_at);
    }

    #[test]
    fn test_group_type_wire_name() {
        assert_eq!(
            serde_json::to_string(&GroupType::ArtBook).unwrap(),
            "\"art_book\""
        );
        assert_eq!(GroupType::ArtBook.as_db_name(), "art_book");
    }

    #[test]
    fn test_request_validation() {
        let mut req = request();
        assert!(req.validate().is_ok());

        req.name = "n".repeat(65);
        assert!(req.validate().is_err());
    }
}
