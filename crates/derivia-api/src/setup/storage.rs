//! Blob store setup

use anyhow::{Context, Result};
use derivia_core::Config;
use derivia_storage::{create_blob_store, BlobStore};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn BlobStore>> {
    let store = create_blob_store(config)
        .await
        .context("Failed to initialize blob store")?;

    // Check once so credentials and connectivity problems show up at startup.
    match store.exists("derivia-startup-check").await {
        Ok(_) => tracing::info!(
            backend = %store.backend_type(),
            bucket = %store.bucket(),
            "Blob store reachable"
        ),
        Err(e) => tracing::warn!(
            backend = %store.backend_type(),
            bucket = %store.bucket(),
            error = %e,
            "Blob store startup check failed; requests may fail until it recovers"
        ),
    }

    Ok(store)
}
