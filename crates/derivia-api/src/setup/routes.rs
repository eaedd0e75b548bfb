//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use derivia_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Trigger events carry a path and little else.
const MAX_EVENT_BODY_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let timeout = Duration::from_secs(config.request_timeout_secs());
    tracing::info!(
        timeout_secs = config.request_timeout_secs(),
        "Request timeout layer enabled"
    );

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/invoke", post(handlers::derivative::invoke))
        .route("/", get(handlers::derivative::get_by_query))
        .route("/{*path}", get(handlers::derivative::get_by_path))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::new(timeout)),
        )
        .layer(DefaultBodyLimit::max(MAX_EVENT_BODY_BYTES))
        .with_state(state);

    Ok(app)
}
