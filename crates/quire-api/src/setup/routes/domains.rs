//! Route groups, one per handler module.

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use quire_db::Database;
use std::sync::Arc;

pub fn user_routes<D: Database>() -> Router<Arc<AppState<D>>> {
    Router::new()
        .route(&format!("{}/users/me", API_PREFIX), get(handlers::users::get_me::<D>))
        .route(&format!("{}/users", API_PREFIX), get(handlers::users::list_users::<D>))
}

pub fn file_routes<D: Database>() -> Router<Arc<AppState<D>>> {
    Router::new()
        .route(&format!("{}/files", API_PREFIX), post(handlers::files::upload_file::<D>))
        .route(
            &format!("{}/files/{{id}}", API_PREFIX),
            get(handlers::files::download_file::<D>),
        )
}

pub fn resource_routes<D: Database>() -> Router<Arc<AppState<D>>> {
    Router::new()
        .route(
            &format!("{}/resources", API_PREFIX),
            post(handlers::resources::create_resource::<D>)
                .get(handlers::resources::list_resources::<D>),
        )
        .route(
            &format!("{}/resources/{{id}}", API_PREFIX),
            get(handlers::resources::get_resource::<D>),
        )
        .route(
            &format!("{}/resources/{{id}}/file", API_PREFIX),
            get(handlers::resources::download_resource_file::<D>),
        )
}

pub fn group_routes<D: Database>() -> Router<Arc<AppState<D>>> {
    Router::new()
        .route(
            &format!("{}/groups", API_PREFIX),
            post(handlers::groups::create_group::<D>).get(handlers::groups::list_groups::<D>),
        )
        .route(
            &format!("{}/groups/{{id}}", API_PREFIX),
            get(handlers::groups::get_group::<D>)
                .put(handlers::groups::edit_group::<D>)
                .delete(handlers::groups::delete_group::<D>),
        )
        .route(
            &format!("{}/groups/{{id}}/resources", API_PREFIX),
            post(handlers::groups::add_resource::<D>),
        )
}

pub fn health_routes<D: Database>() -> Router<Arc<AppState<D>>> {
    Router::new().route(
        &format!("{}/health", API_PREFIX),
        get(handlers::health::health_check::<D>),
    )
}
