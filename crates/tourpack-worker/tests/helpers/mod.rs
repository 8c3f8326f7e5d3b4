//! Test helpers: an in-memory pipeline with a recording publisher.
#![allow(dead_code)]

pub mod fixtures;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tourpack_core::{Config, PipelineError, PipelineResult, StorageBackend};
use tourpack_infra::{NotificationGateway, Publisher};
use tourpack_storage::MemoryStorage;
use tourpack_worker::{EventDispatcher, TourProcessor};

pub const UPLOAD_BUCKET: &str = "uploads";
pub const TOURS_BUCKET: &str = "tours-bucket";
pub const TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:tour-events";

#[derive(Debug, Clone)]
pub struct Published {
    pub topic: String,
    pub message: serde_json::Value,
    pub subject: String,
}

/// Publisher that keeps every message it is given
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<Published>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<Published> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, message: &str, subject: &str) -> PipelineResult<()> {
        if self.fail {
            return Err(PipelineError::NotificationDelivery("topic unavailable".to_string()));
        }
        self.messages.lock().unwrap().push(Published {
            topic: topic.to_string(),
            message: serde_json::from_str(message).unwrap(),
            subject: subject.to_string(),
        });
        Ok(())
    }
}

/// Processor wired to memory storage and a recording publisher.
pub struct TestPipeline {
    pub processor: TourProcessor,
    pub storage: Arc<MemoryStorage>,
    pub publisher: Arc<RecordingPublisher>,
    pub scratch: TempDir,
}

pub fn config(scratch: &TempDir) -> Config {
    let mut config = Config::new(TOURS_BUCKET);
    config.storage_backend = StorageBackend::Memory;
    config.scratch_dir = scratch.path().to_path_buf();
    config
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        Self::build(adjust, RecordingPublisher::default())
    }

    pub fn with_publisher(publisher: RecordingPublisher) -> Self {
        Self::build(|_| {}, publisher)
    }

    fn build(adjust: impl FnOnce(&mut Config), publisher: RecordingPublisher) -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let mut config = config(&scratch);
        adjust(&mut config);

        let storage = Arc::new(MemoryStorage::new());
        let publisher = Arc::new(publisher);
        let dispatcher = EventDispatcher::new(storage.clone(), &config);
        let gateway = NotificationGateway::new().with_publisher(publisher.clone(), TOPIC);

        Self {
            processor: TourProcessor::new(dispatcher, gateway)
                .with_batch_mode(config.webhook.batch_mode),
            storage,
            publisher,
            scratch,
        }
    }

    /// Place an upload in the source bucket
    pub fn upload(&self, key: &str, data: Vec<u8>) {
        self.storage.insert(UPLOAD_BUCKET, key, data);
    }

    pub fn extracted_keys(&self) -> Vec<String> {
        self.storage.keys(TOURS_BUCKET)
    }

    /// Entries left in the scratch directory
    pub fn scratch_files(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}
