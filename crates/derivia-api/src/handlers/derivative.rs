//! Derivative request handlers
//!
//! Three entry points share one pipeline: the request path itself, a `path`
//! query parameter, and a trigger event posted as JSON.

use crate::pipeline::{ResponseEnvelope, TriggerResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

/// `{ "queryStringParameters": { "path": "..." } }`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    #[serde(default)]
    pub query_string_parameters: Option<PathQuery>,
}

impl TriggerEvent {
    fn path(self) -> String {
        self.query_string_parameters
            .and_then(|q| q.path)
            .unwrap_or_default()
    }
}

pub async fn get_by_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> ResponseEnvelope {
    state.pipeline.handle(&path).await
}

pub async fn get_by_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> ResponseEnvelope {
    state
        .pipeline
        .handle(query.path.as_deref().unwrap_or_default())
        .await
}

pub async fn invoke(
    State(state): State<Arc<AppState>>,
    Json(event): Json<TriggerEvent>,
) -> Json<TriggerResponse> {
    let envelope = state.pipeline.handle(&event.path()).await;
    Json(envelope.to_trigger_response())
}
