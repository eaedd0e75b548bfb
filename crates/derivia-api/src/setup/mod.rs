//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use derivia_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        response_mode = ?config.response_mode(),
        "Configuration loaded and validated successfully"
    );

    let store = storage::setup_storage(&config).await?;

    let state = Arc::new(AppState::new(config.clone(), store));
    tracing::info!(
        post_effect = state.pipeline.post_effect_name(),
        single_flight = config.single_flight(),
        "Derivative pipeline ready"
    );

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
