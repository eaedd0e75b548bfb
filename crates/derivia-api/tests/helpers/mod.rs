//! Test helpers: build AppState and router for integration tests.
//!
//! Every app runs against an in-memory blob store so tests can seed origins,
//! count store accesses and inject failures.
//!
//! Run from workspace root: `cargo test -p derivia-api`.

pub mod fixtures;

use axum_test::TestServer;
use derivia_api::pipeline::DerivativePipeline;
use derivia_api::setup::routes;
use derivia_api::state::AppState;
use derivia_core::{Config, DerivativeConfig, StorageBackend};
use derivia_processing::TransformEngine;
use derivia_storage::{BlobStore, MemoryStore};
use std::sync::Arc;

pub const BUCKET: &str = "images";

/// Test application: server plus direct handles on its store and state.
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config(configure: impl FnOnce(&mut DerivativeConfig)) -> Config {
    let mut inner = DerivativeConfig::with_bucket(BUCKET);
    inner.storage_backend = StorageBackend::Memory;
    configure(&mut inner);
    Config(Box::new(inner))
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {})
}

pub fn setup_test_app_with(configure: impl FnOnce(&mut DerivativeConfig)) -> TestApp {
    let config = test_config(configure);
    let engine = TransformEngine::new(&config);
    build(config, engine)
}

pub fn setup_test_app_with_engine(engine: TransformEngine) -> TestApp {
    build(test_config(|_| {}), engine)
}

fn build(config: Config, engine: TransformEngine) -> TestApp {
    config.validate().expect("Invalid test configuration");

    let store = Arc::new(MemoryStore::new(BUCKET));
    let blob_store: Arc<dyn BlobStore> = store.clone();
    let pipeline = DerivativePipeline::with_engine(&config, blob_store.clone(), engine);
    let state = Arc::new(AppState::with_pipeline(config.clone(), blob_store, pipeline));

    let app = routes::setup_routes(&config, state.clone()).expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        store,
        state,
    }
}
