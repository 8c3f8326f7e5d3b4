//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tourpack_core::PipelineError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => PipelineError::Config(msg),
            other => PipelineError::StorageIo(other.to_string()),
        }
    }
}

/// User metadata attached to a stored object
pub type ObjectMetadata = BTreeMap<String, String>;

/// Storage abstraction trait
///
/// Every operation names its bucket explicitly: the pipeline reads archives from the
/// upload bucket named in each event and writes extracted files to the configured
/// destination bucket through the same instance.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Download a whole object
    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Write an object, replacing any existing object under the same key
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()>;

    /// Delete an object
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
