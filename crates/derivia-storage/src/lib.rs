//! Derivia Storage Library
//!
//! Blob store abstraction and its backends (S3, local filesystem, memory).
//!
//! # Key format
//!
//! Keys are the bucket-relative paths of origins (`[dir/]filename`) and
//! derivatives (`[dir/]{size}/filename`). Keys must not be empty, contain
//! `..` segments or start with `/`.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use derivia_core::StorageBackend;
pub use factory::create_blob_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
pub use memory::MemoryStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3Store;
pub use traits::{BlobStore, ObjectMetadata, StorageError, StorageResult};
