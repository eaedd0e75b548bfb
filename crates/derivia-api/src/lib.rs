//! Derivia API library
//!
//! Exposes the pipeline, handlers and router setup so integration tests can
//! drive the service in-process.

pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod setup;
pub mod state;
pub mod telemetry;
