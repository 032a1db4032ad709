//! Data models for the application
//!
//! Each sub-module represents one domain entity together with the request and
//! response shapes built around it.

mod file;
mod group;
mod resource;
mod user;

// Re-export all models for convenient imports
pub use file::*;
pub use group::*;
pub use resource::*;
pub use user::*;
