use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tourpack_core::constants::{ARCHIVE_EXTENSION, S3_EVENT_SOURCE};
use tourpack_core::models::{BatchResult, ExtractedTour, ExtractionOutcome, SourceLocation, UploadEvent};
use tourpack_core::{Config, LogLevel, PipelineError, PipelineResult};
use tourpack_storage::Storage;

use crate::extractor::ArchiveExtractor;

const SCRATCH_PREFIX: &str = "tourpack-";

/// Runs every upload event of a batch through validation, extraction and source
/// cleanup.
///
/// Events are independent: a failure is recorded in that event's outcome and the
/// batch carries on. Outcomes come back in input order whatever the concurrency.
pub struct EventDispatcher {
    storage: Arc<dyn Storage>,
    extractor: ArchiveExtractor,
    max_archive_bytes: u64,
    max_concurrent_extractions: usize,
    scratch_dir: PathBuf,
}

impl EventDispatcher {
    pub fn new(storage: Arc<dyn Storage>, config: &Config) -> Self {
        Self {
            extractor: ArchiveExtractor::new(
                storage.clone(),
                config.destination_bucket.clone(),
                config.max_entry_bytes,
            ),
            storage,
            max_archive_bytes: config.max_archive_bytes,
            max_concurrent_extractions: config.max_concurrent_extractions.max(1),
            scratch_dir: config.scratch_dir.clone(),
        }
    }

    #[tracing::instrument(skip(self, events), fields(events = events.len()))]
    pub async fn handle_batch(&self, events: Vec<UploadEvent>) -> BatchResult {
        let mut slots: Vec<Option<ExtractionOutcome>> = vec![None; events.len()];

        let mut outcomes = stream::iter(events.iter().enumerate())
            .map(|(index, event)| async move { (index, self.handle_event(event).await) })
            .buffer_unordered(self.max_concurrent_extractions);

        while let Some((index, outcome)) = outcomes.next().await {
            slots[index] = Some(outcome);
        }

        let result = BatchResult::new(slots.into_iter().flatten().collect());
        tracing::info!(
            outcomes = result.len(),
            extracted = result.tours().count(),
            "Batch handled"
        );
        result
    }

    async fn handle_event(&self, event: &UploadEvent) -> ExtractionOutcome {
        match self.process(event).await {
            Ok(tour) => {
                self.delete_source(&event.source).await;
                ExtractionOutcome::Extracted(tour)
            }
            Err(e) => {
                match e.log_level() {
                    LogLevel::Debug => {
                        tracing::debug!(source = %event.source, error = %e, "Upload ignored")
                    }
                    LogLevel::Warn => {
                        tracing::warn!(source = %event.source, error = %e, "Upload rejected")
                    }
                    LogLevel::Error => {
                        tracing::error!(source = %event.source, error = %e, "Upload processing failed")
                    }
                }
                ExtractionOutcome::failed(&event.source, &e)
            }
        }
    }

    async fn process(&self, event: &UploadEvent) -> PipelineResult<ExtractedTour> {
        validate(event)?;
        let source = &event.source;

        if event.size > self.max_archive_bytes {
            return Err(self.too_large(source, event.size));
        }

        let data = self.storage.download(&source.bucket, &source.key).await?;
        if data.len() as u64 > self.max_archive_bytes {
            return Err(self.too_large(source, data.len() as u64));
        }

        // Removed when `scratch` drops, on every exit path
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(ARCHIVE_EXTENSION)
            .tempfile_in(&self.scratch_dir)?;
        tokio::fs::write(scratch.path(), &data).await?;
        drop(data);

        let reader = std::io::BufReader::new(scratch.reopen()?);
        self.extractor.extract(reader, source).await
    }

    async fn delete_source(&self, source: &SourceLocation) {
        match self.storage.delete(&source.bucket, &source.key).await {
            Ok(()) => tracing::info!(source = %source, "Deleted original archive"),
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "Failed to delete original archive")
            }
        }
    }

    fn too_large(&self, source: &SourceLocation, size: u64) -> PipelineError {
        PipelineError::ArchiveTooLarge {
            archive: source.key.clone(),
            size,
            limit: self.max_archive_bytes,
        }
    }
}

/// Only storage notifications for `.zip` objects are processed.
pub fn validate(event: &UploadEvent) -> PipelineResult<()> {
    let is_archive = event
        .source
        .key
        .to_lowercase()
        .ends_with(ARCHIVE_EXTENSION);
    if event.event_source != S3_EVENT_SOURCE || !is_archive {
        return Err(PipelineError::NotAnArchive(event.source.key.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(source: &str, key: &str) -> UploadEvent {
        UploadEvent::new(source, SourceLocation::new("uploads", key), 10)
    }

    #[test]
    fn accepts_zip_case_insensitively() {
        assert!(validate(&event("aws:s3", "a/tour.zip")).is_ok());
        assert!(validate(&event("aws:s3", "TOUR.ZIP")).is_ok());
    }

    #[test]
    fn rejects_other_keys_and_sources() {
        let err = validate(&event("aws:s3", "notes.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::NotAnArchive(ref key) if key == "notes.txt"));
        assert!(validate(&event("aws:s3", "archive.zip.bak")).is_err());
        assert!(validate(&event("aws:sqs", "tour.zip")).is_err());
        assert!(validate(&event("", "tour.zip")).is_err());
    }
}
