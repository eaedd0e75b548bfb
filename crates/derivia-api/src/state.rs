//! Application state shared by all handlers

use crate::pipeline::DerivativePipeline;
use derivia_core::Config;
use derivia_storage::BlobStore;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn BlobStore>,
    pub pipeline: DerivativePipeline,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn BlobStore>) -> Self {
        let pipeline = DerivativePipeline::new(&config, store.clone());
        Self {
            config,
            store,
            pipeline,
        }
    }

    /// State around an already-built pipeline (tests swap in their own engine)
    pub fn with_pipeline(config: Config, store: Arc<dyn BlobStore>, pipeline: DerivativePipeline) -> Self {
        Self {
            config,
            store,
            pipeline,
        }
    }
}
