//! Application setup and initialization
//!
//! Startup order: configuration, telemetry, database (pool, migrations,
//! lookup seeding), storage, services, routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use quire_core::Config;
use std::sync::Arc;

/// Initialize the application state and router
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router)> {
    config.validate()?;

    crate::telemetry::init_telemetry()?;
    tracing::info!(
        environment = %config.environment,
        storage_backend = %config.storage_backend,
        "Starting Quire"
    );

    let pool = database::setup_database(&config).await?;

    let storage = quire_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");

    let state = services::setup_services(&config, pool, storage)?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
