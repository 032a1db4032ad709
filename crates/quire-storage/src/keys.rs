//! Shared key generation for storage backends.
//!
//! Key format: `files/{file_id}`.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

/// Storage key of an uploaded file's bytes.
pub fn file_key(file_id: Uuid) -> String {
    format!("files/{}", file_id)
}

/// Reject keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_is_valid() {
        let key = file_key(Uuid::new_v4());
        assert!(key.starts_with("files/"));
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn test_traversal_keys_rejected() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
    }
}
