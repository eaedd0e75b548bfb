//! Error types module
//!
//! Every failure a derivative request can end in is a [`DerivativeError`].
//! The first four variants are detected before any store I/O; the rest come
//! out of the blob store or the transform engine and carry their cause.

use crate::models::FIT_ACTIONS;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for bad origins and refused content
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "WHITELIST_REJECTED")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the same request may succeed
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum DerivativeError {
    #[error("Invalid path: {0}")]
    InvalidSpec(String),

    #[error("WHITELIST is set but does not contain the size parameter \"{token}\"")]
    WhitelistRejected { token: String },

    #[error(
        "Unknown Fit action parameter \"{fit}\"\nAvailable Fit action: {available}.",
        available = FIT_ACTIONS.join(", ")
    )]
    UnknownFit { fit: String },

    #[error("Requested {dimension} {requested} exceeds the maximum of {max}")]
    DimensionTooLarge {
        dimension: &'static str,
        requested: u32,
        max: u32,
    },

    #[error("Origin image \"{key}\" not found")]
    OriginNotFound { key: String },

    #[error("Unsupported content type \"{content_type}\"")]
    UnsupportedMimeType { content_type: String },

    #[error("Transform failed: {message}")]
    TransformFailure {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Storage failure: {message}")]
    StorageFailure {
        message: String,
        /// Status surfaced by the backend (e.g. 403 for access denied)
        status: Option<u16>,
    },
}

impl DerivativeError {
    pub fn transform(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        DerivativeError::TransformFailure {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        DerivativeError::StorageFailure {
            message: message.into(),
            status: None,
        }
    }

    /// Whether the failure was detected before touching the blob store.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            DerivativeError::InvalidSpec(_)
                | DerivativeError::WhitelistRejected { .. }
                | DerivativeError::UnknownFit { .. }
                | DerivativeError::DimensionTooLarge { .. }
        )
    }

    /// Get the error type name for log fields
    pub fn error_type(&self) -> &'static str {
        match self {
            DerivativeError::InvalidSpec(_) => "InvalidSpec",
            DerivativeError::WhitelistRejected { .. } => "WhitelistRejected",
            DerivativeError::UnknownFit { .. } => "UnknownFit",
            DerivativeError::DimensionTooLarge { .. } => "DimensionTooLarge",
            DerivativeError::OriginNotFound { .. } => "OriginNotFound",
            DerivativeError::UnsupportedMimeType { .. } => "UnsupportedMimeType",
            DerivativeError::TransformFailure { .. } => "TransformFailure",
            DerivativeError::StorageFailure { .. } => "StorageFailure",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, log_level).
fn static_metadata(err: &DerivativeError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        DerivativeError::InvalidSpec(_) => (400, "INVALID_SPEC", false, LogLevel::Debug),
        DerivativeError::WhitelistRejected { .. } => {
            (400, "WHITELIST_REJECTED", false, LogLevel::Debug)
        }
        DerivativeError::UnknownFit { .. } => (400, "UNKNOWN_FIT", false, LogLevel::Debug),
        DerivativeError::DimensionTooLarge { .. } => {
            (400, "DIMENSION_TOO_LARGE", false, LogLevel::Debug)
        }
        DerivativeError::OriginNotFound { .. } => (404, "ORIGIN_NOT_FOUND", false, LogLevel::Debug),
        DerivativeError::UnsupportedMimeType { .. } => {
            (400, "UNSUPPORTED_MIME_TYPE", false, LogLevel::Warn)
        }
        DerivativeError::TransformFailure { .. } => {
            (422, "TRANSFORM_FAILURE", false, LogLevel::Warn)
        }
        DerivativeError::StorageFailure { status, .. } => (
            status.unwrap_or(500),
            "STORAGE_FAILURE",
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for DerivativeError {
    fn http_status_code(&self) -> u16 {
        static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            DerivativeError::TransformFailure { message, .. }
            | DerivativeError::StorageFailure { message, .. } => format!("Exception: {}", message),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).3
    }
}
