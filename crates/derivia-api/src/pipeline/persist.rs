use bytes::Bytes;
use derivia_core::{Config, DerivativeError, DerivativeKey};
use derivia_storage::{BlobStore, ObjectMetadata};
use std::sync::Arc;

/// Writes derivatives back to the blob store.
#[derive(Clone)]
pub struct Persister {
    store: Arc<dyn BlobStore>,
    cache_control: String,
}

impl Persister {
    pub fn new(config: &Config, store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            cache_control: config.cache_control().to_string(),
        }
    }

    pub async fn store(
        &self,
        key: &DerivativeKey,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), DerivativeError> {
        let size = data.len() as u64;
        let metadata = ObjectMetadata {
            content_type: Some(content_type.to_string()),
            cache_control: Some(self.cache_control.clone()),
        };

        self.store
            .put(key.as_str(), data, metadata)
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "Failed to persist derivative");
                DerivativeError::from(e)
            })?;

        tracing::info!(
            key = %key,
            bucket = %self.store.bucket(),
            size_bytes = size,
            content_type = %content_type,
            "Derivative persisted"
        );
        Ok(())
    }
}
