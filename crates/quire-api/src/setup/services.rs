//! Service wiring: identity directory, database seam and orchestrators

use anyhow::{Context, Result};
use quire_core::Config;
use quire_db::PgDatabase;
use quire_services::{
    CachedUserDirectory, FileService, GroupService, IdentityServiceClient, ResourceService,
    UserDirectory, UserResolver,
};
use quire_storage::Storage;
use sqlx::PgPool;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::auth::SessionLifetime;
use crate::state::AppState;

pub fn setup_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let identity = IdentityServiceClient::from_config(config)?;
    let session_capacity = NonZeroUsize::new(config.session_cache_capacity)
        .context("SESSION_CACHE_CAPACITY must be positive")?;
    let directory: Arc<dyn UserDirectory> = Arc::new(CachedUserDirectory::new(
        identity,
        session_capacity,
        config.roster_cache_ttl(),
    ));
    tracing::info!(
        identity_base_url = %config.identity_base_url,
        roster_cache_ttl_secs = config.roster_cache_ttl_seconds,
        session_cache_capacity = config.session_cache_capacity,
        "User directory configured"
    );

    let users = UserResolver::new(directory);
    let db = Arc::new(PgDatabase::new(pool));
    let stores = db.stores();

    Ok(Arc::new(AppState {
        groups: GroupService::new(Arc::clone(&db), stores.clone(), users.clone()),
        resources: ResourceService::new(
            Arc::clone(&db),
            stores.clone(),
            users.clone(),
            Arc::clone(&storage),
        ),
        files: FileService::new(
            Arc::clone(&db),
            stores,
            users.clone(),
            storage,
            config.max_file_size_bytes,
        ),
        users,
        db,
        session_lifetime: SessionLifetime(config.session_lifetime()),
    }))
}
