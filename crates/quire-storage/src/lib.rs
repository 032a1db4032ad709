//! Quire Storage Library
//!
//! Byte storage for uploaded files behind the [`Storage`] trait, with a local
//! filesystem backend and an S3-compatible object store backend.
//!
//! # Storage key format
//!
//! Every file is stored under `files/{file_id}`. Keys must not contain `..` or
//! a leading `/`; key generation and validation live in the `keys` module so
//! all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::file_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use quire_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
