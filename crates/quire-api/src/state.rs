//! Application state shared by every handler.
//!
//! The state is generic over the [`Database`] so the same router serves
//! PostgreSQL in production and the in-memory database in tests.

use axum::extract::FromRef;
use quire_db::{Database, PgDatabase};
use quire_services::{FileService, GroupService, ResourceService, UserResolver};
use std::sync::Arc;

use crate::auth::SessionLifetime;

pub struct AppState<D: Database = PgDatabase> {
    pub db: Arc<D>,
    pub users: UserResolver,
    pub groups: GroupService<D>,
    pub resources: ResourceService<D>,
    pub files: FileService<D>,
    pub session_lifetime: SessionLifetime,
}

impl<D: Database> FromRef<Arc<AppState<D>>> for SessionLifetime {
    fn from_ref(state: &Arc<AppState<D>>) -> Self {
        state.session_lifetime
    }
}
