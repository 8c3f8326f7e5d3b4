use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory (under the storage root) holding per-object metadata sidecars
const METADATA_DIR: &str = ".metadata";

/// Content type and user metadata persisted next to each object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

/// Local filesystem storage implementation
///
/// Objects live at `{base_path}/{bucket}/{key}`; metadata at
/// `{base_path}/.metadata/{bucket}/{key}.json`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance rooted at `base_path`
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Reject bucket/key components that could escape the storage root.
    fn validate_segment(value: &str, what: &str) -> StorageResult<()> {
        if value.is_empty() || value.starts_with('/') || value.contains('\\') {
            return Err(StorageError::InvalidKey(format!("invalid {}: {:?}", what, value)));
        }
        let escapes = Path::new(value)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::InvalidKey(format!(
                "{} contains path traversal: {:?}",
                what, value
            )));
        }
        Ok(())
    }

    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        Self::validate_segment(bucket, "bucket")?;
        Self::validate_segment(key, "key")?;
        if bucket == METADATA_DIR {
            return Err(StorageError::InvalidKey(format!("reserved bucket name: {}", bucket)));
        }
        Ok(self.base_path.join(bucket).join(key))
    }

    fn metadata_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        self.object_path(bucket, key)?;
        Ok(self
            .base_path
            .join(METADATA_DIR)
            .join(bucket)
            .join(format!("{}.json", key)))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Read the content type and metadata stored alongside an object
    pub async fn read_metadata(&self, bucket: &str, key: &str) -> StorageResult<StoredMetadata> {
        let path = self.metadata_path(bucket, key)?;
        let raw = fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(format!("{}/{}", bucket, key)),
            _ => StorageError::IoError(e),
        })?;
        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::DownloadFailed(format!("corrupt metadata sidecar: {}", e)))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        let start = std::time::Instant::now();

        let data = fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(format!("{}/{}", bucket, key)),
            _ => StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            )),
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        let meta_path = self.metadata_path(bucket, key)?;
        let size = data.len();
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;
        self.ensure_parent_dir(&meta_path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let sidecar = StoredMetadata {
            content_type: content_type.to_string(),
            metadata: metadata.clone(),
        };
        let sidecar_json = serde_json::to_vec(&sidecar)
            .map_err(|e| StorageError::UploadFailed(format!("Failed to encode metadata: {}", e)))?;
        fs::write(&meta_path, sidecar_json).await?;

        tracing::debug!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        let meta_path = self.metadata_path(bucket, key)?;

        // Deleting a missing object succeeds, matching S3 semantics
        for target in [&path, &meta_path] {
            match fs::remove_file(target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!(
                        "Failed to delete file {}: {}",
                        target.display(),
                        e
                    )))
                }
            }
        }

        tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
