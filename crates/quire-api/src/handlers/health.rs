use axum::{extract::State, http::StatusCode, Json};
use quire_db::Database;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::state::AppState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub database: String,
}

/// Opens and rolls back a transaction to prove the database answers.
async fn check_database<D: Database>(db: &D) -> String {
    let ping = async {
        let tx = db.begin().await?;
        db.rollback(tx).await
    };

    match tokio::time::timeout(CHECK_TIMEOUT, ping).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database health check failed");
            format!("unhealthy: {}", e)
        }
        Err(_) => {
            tracing::error!("Database health check timed out");
            "timeout".to_string()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service healthy", body = HealthCheckResponse),
        (status = 503, description = "Database unreachable", body = HealthCheckResponse)
    )
)]
pub async fn health_check<D: Database>(
    State(state): State<Arc<AppState<D>>>,
) -> (StatusCode, Json<HealthCheckResponse>) {
    let database = check_database(&*state.db).await;
    let healthy = database == "healthy";

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        database,
    };
    (status, Json(response))
}
