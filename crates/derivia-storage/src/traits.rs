//! Blob store abstraction trait
//!
//! Every backend distinguishes "found", "not found" and "failed": a missing
//! object is `Ok(None)`, and any other problem is an `Err`. Callers must never
//! treat an error as a miss.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use derivia_core::{DerivativeError, ImageObject};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// HTTP status the backend reported, when it is worth surfacing.
    pub fn surfaced_status(&self) -> Option<u16> {
        match self {
            StorageError::AccessDenied(_) => Some(403),
            _ => None,
        }
    }
}

impl From<StorageError> for DerivativeError {
    fn from(err: StorageError) -> Self {
        DerivativeError::StorageFailure {
            status: err.surfaced_status(),
            message: err.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata written alongside an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// Blob store abstraction trait
///
/// One instance is bound to one bucket for the life of the process.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object with its metadata. `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Option<ImageObject>>;

    /// Write an object, replacing any existing one under the same key.
    async fn put(&self, key: &str, data: Bytes, metadata: ObjectMetadata) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Bucket (or container) this store is bound to
    fn bucket(&self) -> &str;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;
    use derivia_core::ErrorMetadata;

    #[test]
    fn test_access_denied_maps_to_403() {
        let err: DerivativeError = StorageError::AccessDenied("images/cat.jpg".to_string()).into();
        assert_eq!(err.http_status_code(), 403);
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let err: DerivativeError = StorageError::ReadFailed("timeout".to_string()).into();
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "Exception: Read failed: timeout");
    }
}
