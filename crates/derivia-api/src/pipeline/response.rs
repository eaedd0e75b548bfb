//! Response envelope and builder
//!
//! Every request, successful or not, ends in a [`ResponseEnvelope`]. The
//! envelope renders either as an axum response or as the trigger JSON shape
//! returned by `POST /invoke`.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use derivia_core::{Config, DerivativeError, DerivativeKey, ErrorMetadata, ImageObject, ResponseMode};
use serde::Serialize;
use std::collections::BTreeMap;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    Text(String),
    Binary(Bytes),
}

#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

/// JSON form of an envelope for trigger-style invocations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl ResponseEnvelope {
    pub fn new(status_code: u16, body: ResponseBody) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.body, ResponseBody::Binary(_))
    }

    pub fn to_trigger_response(&self) -> TriggerResponse {
        let body = match &self.body {
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Binary(data) => base64::engine::general_purpose::STANDARD.encode(data),
        };
        TriggerResponse {
            status_code: self.status_code,
            headers: self.headers.clone(),
            body,
            is_base64_encoded: self.is_binary(),
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = match self.body {
            ResponseBody::Text(text) => Body::from(text),
            ResponseBody::Binary(data) => Body::from(data),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping header that is not valid HTTP"),
            }
        }
        response
    }
}

/// How a finished request reached its bytes
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Served from a previously persisted derivative
    Hit(ImageObject),
    /// Computed and persisted by this request
    Created { data: Bytes, content_type: String },
    /// Known to be persisted; the body was not fetched
    Present,
}

impl Outcome {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Outcome::Hit(_) | Outcome::Present)
    }
}

#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    mode: ResponseMode,
    public_url: Option<String>,
    cache_control: String,
}

impl ResponseBuilder {
    pub fn new(config: &Config) -> Self {
        Self {
            mode: config.response_mode(),
            public_url: config
                .public_url()
                .map(|url| url.trim_end_matches('/').to_string()),
            cache_control: config.cache_control().to_string(),
        }
    }

    pub fn success(&self, key: &DerivativeKey, outcome: Outcome) -> ResponseEnvelope {
        if self.mode == ResponseMode::RedirectToStored {
            return self.redirect(key);
        }

        match outcome {
            Outcome::Present => self.redirect(key),
            Outcome::Hit(object) => {
                let content_type = object.content_type.as_deref().unwrap_or(OCTET_STREAM);
                let cache_control = object
                    .cache_control
                    .as_deref()
                    .unwrap_or(self.cache_control.as_str());
                let mut envelope = ResponseEnvelope::new(200, ResponseBody::Binary(object.data))
                    .with_header("Content-Type", content_type)
                    .with_header("Cache-Control", cache_control);
                if let Some(modified) = object.last_modified {
                    let age = (Utc::now() - modified).num_seconds().max(0);
                    envelope = envelope.with_header("Age", age.to_string());
                }
                envelope
            }
            Outcome::Created { data, content_type } => {
                ResponseEnvelope::new(200, ResponseBody::Binary(data))
                    .with_header("Content-Type", content_type)
                    .with_header("Cache-Control", self.cache_control.clone())
            }
        }
    }

    fn redirect(&self, key: &DerivativeKey) -> ResponseEnvelope {
        let base = self.public_url.as_deref().unwrap_or_default();
        ResponseEnvelope::new(301, ResponseBody::Text(String::new()))
            .with_header("Location", format!("{}/{}", base, key))
    }

    pub fn error(&self, error: &DerivativeError) -> ResponseEnvelope {
        ResponseEnvelope::new(error.http_status_code(), ResponseBody::Text(error.client_message()))
            .with_header("Content-Type", "text/plain")
            .with_header("Cache-Control", "no-cache")
    }
}
