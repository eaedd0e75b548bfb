//! Error logging for derivative requests
//!
//! Every failure is rendered by the [`ResponseBuilder`](crate::pipeline::ResponseBuilder);
//! this module only decides how loudly it is logged.

use derivia_core::{DerivativeError, ErrorMetadata, LogLevel};

pub fn log_error(error: &DerivativeError, path: &str) {
    let error_type = error.error_type();
    let status = error.http_status_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, status, path = %path, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, status, path = %path, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error.detailed_message(),
                error_type = error_type,
                status,
                path = %path,
                "Request failed"
            );
        }
    }
}
