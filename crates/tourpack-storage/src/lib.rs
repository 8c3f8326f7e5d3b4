//! Tourpack Storage Library
//!
//! This crate provides the storage abstraction used by the extraction pipeline and its
//! implementations for S3, the local filesystem and memory.
//!
//! # Addressing
//!
//! Objects are addressed by `(bucket, key)`. The pipeline reads archives from the
//! bucket named in each upload event and writes extracted files to the configured
//! destination bucket, so one backend instance must serve several buckets.
//!
//! Local keys must not contain `..` components or a leading `/`.

pub mod factory;
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
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use tourpack_core::StorageBackend;
pub use traits::{ObjectMetadata, Storage, StorageError, StorageResult};
