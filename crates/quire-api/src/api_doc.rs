//! OpenAPI documentation, served at [`OPENAPI_PATH`](crate::constants::OPENAPI_PATH)
//! and browsable through RapiDoc at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use quire_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quire API",
        version = "0.1.0",
        description = "Content management API: upload files, wrap them into resources and organize resources into permissioned groups. All endpoints are versioned under /api/v1/ and expect an identity provider access token as a bearer token."
    ),
    paths(
        // Users
        handlers::users::get_me,
        handlers::users::list_users,
        // Files
        handlers::files::upload_file,
        handlers::files::download_file,
        // Resources
        handlers::resources::create_resource,
        handlers::resources::list_resources,
        handlers::resources::get_resource,
        handlers::resources::download_resource_file,
        // Groups
        handlers::groups::create_group,
        handlers::groups::list_groups,
        handlers::groups::get_group,
        handlers::groups::edit_group,
        handlers::groups::delete_group,
        handlers::groups::add_resource,
        // Health
        handlers::health::health_check,
    ),
    components(schemas(
        models::File,
        models::FileInfo,
        models::FileType,
        models::Resource,
        models::ResourceInfo,
        models::ResourceType,
        models::CreateResourceRequest,
        models::Group,
        models::GroupDetail,
        models::GroupInfo,
        models::GroupType,
        models::GroupRequest,
        models::AddResourceRequest,
        models::ReadPermission,
        models::WritePermission,
        models::UserInfo,
        models::UserStatus,
        error::ErrorResponse,
        handlers::health::HealthCheckResponse,
    )),
    modifiers(&BearerAuth),
    security(("bearer" = [])),
    tags(
        (name = "users", description = "Identities known to the identity service"),
        (name = "files", description = "Raw file upload and download"),
        (name = "resources", description = "Named, typed wrappers around files"),
        (name = "groups", description = "Permissioned collections of resources"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = ApiDoc::openapi();
        let paths = &spec.paths.paths;

        for path in [
            "/api/v1/users/me",
            "/api/v1/users",
            "/api/v1/files",
            "/api/v1/files/{id}",
            "/api/v1/resources",
            "/api/v1/resources/{id}",
            "/api/v1/resources/{id}/file",
            "/api/v1/groups",
            "/api/v1/groups/{id}",
            "/api/v1/groups/{id}/resources",
            "/api/v1/health",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
