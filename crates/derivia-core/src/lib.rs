//! Derivia Core Library
//!
//! Domain types shared by every Derivia component: configuration, the error
//! taxonomy, the request path grammar and the validation rules that turn a
//! request path into a [`ResizeSpec`].

pub mod config;
pub mod error;
pub mod models;
pub mod request_path;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, DerivativeConfig, ResponseMode};
pub use error::{DerivativeError, ErrorMetadata, LogLevel};
pub use models::{DerivativeKey, FitMode, ImageObject, ResizeSpec};
pub use request_path::RequestPath;
pub use storage_types::StorageBackend;
pub use validation::ValidationPolicy;
