//! Quire Core Library
//!
//! This crate provides the domain model, enum lookup tables, error types and
//! configuration shared by every Quire component.

pub mod config;
pub mod error;
pub mod lookup;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult, ErrorMetadata, LogLevel};
pub use lookup::LookupEnum;
pub use storage_types::StorageBackend;
