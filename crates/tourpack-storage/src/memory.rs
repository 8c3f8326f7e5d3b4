//! In-memory storage backend for tests and dry runs.

use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// One stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: ObjectMetadata,
}

/// Storage implementation that keeps objects in a map keyed by `(bucket, key)`
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        // A poisoned lock only means another test thread panicked mid-insert
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed an object (e.g. an uploaded archive)
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: "application/octet-stream".to_string(),
                metadata: ObjectMetadata::new(),
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// All keys in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Number of successful `put` calls so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Make every subsequent `put` fail
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete` fail
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.get(bucket, key)
            .map(|object| object.data)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure writing {}/{}",
                bucket, key
            )));
        }
        self.objects().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!(
                "injected failure deleting {}/{}",
                bucket, key
            )));
        }
        self.objects().remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_and_download() {
        let storage = MemoryStorage::new();
        let mut meta = ObjectMetadata::new();
        meta.insert("k".to_string(), "v".to_string());

        storage.put("b", "a.txt", b"hi".to_vec(), "text/plain", &meta).await.unwrap();

        assert_eq!(storage.download("b", "a.txt").await.unwrap(), b"hi");
        assert_eq!(storage.get("b", "a.txt").unwrap().metadata, meta);
        assert_eq!(storage.put_count(), 1);
        assert_eq!(storage.keys("b"), vec!["a.txt".to_string()]);
        assert!(storage.keys("other").is_empty());
    }

    #[tokio::test]
    async fn injected_failures() {
        let storage = MemoryStorage::new();
        storage.insert("b", "a.zip", vec![1]);

        storage.fail_deletes(true);
        assert!(matches!(
            storage.delete("b", "a.zip").await,
            Err(StorageError::DeleteFailed(_))
        ));
        assert!(storage.contains("b", "a.zip"));

        storage.fail_puts(true);
        let result = storage
            .put("b", "x", vec![], "text/plain", &ObjectMetadata::new())
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert_eq!(storage.put_count(), 0);
    }

    #[tokio::test]
    async fn missing_object() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.download("b", "nope").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
