#[cfg(feature = "storage-local")]
use crate::LocalStore;
#[cfg(feature = "storage-s3")]
use crate::S3Store;
use crate::{BlobStore, MemoryStore, StorageBackend, StorageError, StorageResult};
use derivia_core::Config;
use std::sync::Arc;

/// Create a blob store based on configuration
pub async fn create_blob_store(config: &Config) -> StorageResult<Arc<dyn BlobStore>> {
    let bucket = config.bucket().to_string();

    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let region = config
                .s3_region()
                .or_else(|| config.aws_region())
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
                })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let store = S3Store::new(bucket, region, endpoint).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;

            let store = LocalStore::new(base_path, bucket).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => {
            tracing::warn!(bucket = %bucket, "Using in-memory blob store; nothing is persisted");
            Ok(Arc::new(MemoryStore::new(bucket)))
        }
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use derivia_core::DerivativeConfig;

    #[tokio::test]
    async fn test_create_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut inner = DerivativeConfig::with_bucket("images");
        inner.storage_backend = StorageBackend::Local;
        inner.local_storage_path = Some(dir.path().to_string_lossy().into_owned());

        let store = create_blob_store(&Config(Box::new(inner))).await.unwrap();
        assert_eq!(store.backend_type(), StorageBackend::Local);
        assert_eq!(store.bucket(), "images");
    }

    #[tokio::test]
    async fn test_local_store_requires_path() {
        let mut inner = DerivativeConfig::with_bucket("images");
        inner.storage_backend = StorageBackend::Local;

        let result = create_blob_store(&Config(Box::new(inner))).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
