//! Quire API Library
//!
//! This crate provides the HTTP handlers, the bearer-session extractor, the
//! error rendering and the application setup around the quire-services
//! orchestrators.

pub mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use setup::routes::{api_routes, setup_routes};
pub use state::AppState;
