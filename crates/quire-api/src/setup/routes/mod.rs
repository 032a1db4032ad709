//! Route configuration and setup.
//!
//! Route groups live in [domains](domains); this module adds the OpenAPI
//! docs and the middleware stack shared by every route.

mod domains;

use crate::api_doc::ApiDoc;
use crate::constants::{MULTIPART_OVERHEAD_BYTES, OPENAPI_PATH};
use crate::error::ErrorResponse;
use crate::state::AppState;
use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    BoxError, Json, Router,
};
use quire_core::Config;
use quire_db::Database;
use std::sync::Arc;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

/// Routes of every handler module, without state or middleware
pub fn api_routes<D: Database>() -> Router<Arc<AppState<D>>> {
    Router::new()
        .merge(domains::health_routes())
        .merge(domains::user_routes())
        .merge(domains::file_routes())
        .merge(domains::resource_routes())
        .merge(domains::group_routes())
}

/// Setup all application routes
pub fn setup_routes<D: Database>(
    config: &Config,
    state: Arc<AppState<D>>,
) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let request_timeout = config.request_timeout();
    tracing::info!(
        request_timeout_secs = request_timeout.as_secs(),
        "Request timeout layer enabled"
    );

    let app = api_routes()
        .merge(RapiDoc::with_openapi(OPENAPI_PATH, ApiDoc::openapi()).path("/docs"))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(RequestBodyLimitLayer::new(
            config.max_file_size_bytes + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// A timed-out request drops the handler future, and with it any open transaction.
async fn handle_middleware_error(err: BoxError) -> (StatusCode, Json<ErrorResponse>) {
    if err.is::<Elapsed>() {
        tracing::warn!("Request timed out");
        let mut body = ErrorResponse::new("Request timed out", "REQUEST_TIMEOUT");
        body.recoverable = true;
        return (StatusCode::REQUEST_TIMEOUT, Json(body));
    }

    tracing::error!(error = %err, "Unhandled middleware error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error", "INTERNAL_ERROR")),
    )
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
