use derivia_core::{Config, DerivativeError};
use derivia_processing::{LoadedOrigin, MimePolicy};
use derivia_storage::BlobStore;
use std::sync::Arc;

/// Reads origin images and classifies them for the transform engine.
#[derive(Clone)]
pub struct OriginLoader {
    store: Arc<dyn BlobStore>,
    mime: MimePolicy,
}

impl OriginLoader {
    pub fn new(config: &Config, store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            mime: MimePolicy::new(config),
        }
    }

    pub async fn load(&self, origin_key: &str) -> Result<LoadedOrigin, DerivativeError> {
        let object = self
            .store
            .get(origin_key)
            .await?
            .ok_or_else(|| DerivativeError::OriginNotFound {
                key: origin_key.to_string(),
            })?;

        let content_type =
            MimePolicy::resolve_content_type(object.content_type.as_deref(), &object.data);
        let class = self.mime.classify(&content_type)?;

        tracing::debug!(
            key = %origin_key,
            content_type = %content_type,
            class = ?class,
            size_bytes = object.size_bytes() as u64,
            "Origin loaded"
        );

        Ok(LoadedOrigin {
            key: object.key,
            content_type,
            class,
            data: object.data,
        })
    }
}
