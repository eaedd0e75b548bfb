use derivia_core::{DerivativeError, DerivativeKey, ImageObject};
use derivia_storage::BlobStore;
use std::sync::Arc;

/// Looks up previously persisted derivatives.
#[derive(Clone)]
pub struct CacheResolver {
    store: Arc<dyn BlobStore>,
}

impl CacheResolver {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// `Ok(None)` is a miss. Any store error is surfaced, never treated as one.
    pub async fn lookup(&self, key: &DerivativeKey) -> Result<Option<ImageObject>, DerivativeError> {
        let object = self.store.get(key.as_str()).await?;
        match &object {
            Some(object) => tracing::debug!(
                key = %key,
                size_bytes = object.size_bytes() as u64,
                "Derivative cache hit"
            ),
            None => tracing::debug!(key = %key, "Derivative cache miss"),
        }
        Ok(object)
    }

    /// Presence check without downloading the body
    pub async fn exists(&self, key: &DerivativeKey) -> Result<bool, DerivativeError> {
        let present = self.store.exists(key.as_str()).await?;
        tracing::debug!(key = %key, present, "Derivative presence check");
        Ok(present)
    }
}
