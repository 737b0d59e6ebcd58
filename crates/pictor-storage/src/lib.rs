//! Pictor Storage Library
//!
//! Blob store abstraction for source and transformed image bytes, with local
//! filesystem, in-memory and S3 backends.
//!
//! # Storage key format
//!
//! All backends use the same layout: `images/{owner_id}/{filename}`. Keys
//! must not contain `..` or a leading `/`.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use pictor_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
