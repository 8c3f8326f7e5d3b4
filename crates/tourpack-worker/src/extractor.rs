use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::io::{self, Read, Seek};
use std::sync::Arc;
use tokio::sync::mpsc;
use tourpack_core::constants::{META_EXTRACTION_TIME, META_ORIGINAL_ARCHIVE, META_TOUR_NAME};
use tourpack_core::models::{ExtractedEntry, ExtractedTour, SourceLocation};
use tourpack_core::{PipelineError, PipelineResult};
use tourpack_storage::{ObjectMetadata, Storage};
use zip::ZipArchive;

use crate::mapper::{EntryMapper, EntryMapping};

/// Entries read ahead of the upload in progress
const READ_AHEAD: usize = 1;

type ReadEntry = (ExtractedEntry, Vec<u8>);

/// Unpacks one archive into the destination bucket.
///
/// The archive is walked on the blocking pool and each entry is handed back to be
/// written as soon as it is read. A container that cannot be opened fails before
/// anything is written; a failure part way through leaves the entries already written
/// in place.
pub struct ArchiveExtractor {
    storage: Arc<dyn Storage>,
    destination_bucket: String,
    max_entry_bytes: u64,
}

impl ArchiveExtractor {
    pub fn new(
        storage: Arc<dyn Storage>,
        destination_bucket: impl Into<String>,
        max_entry_bytes: u64,
    ) -> Self {
        Self {
            storage,
            destination_bucket: destination_bucket.into(),
            max_entry_bytes,
        }
    }

    #[tracing::instrument(skip(self, reader, source), fields(archive = %source))]
    pub async fn extract<R>(&self, reader: R, source: &SourceLocation) -> PipelineResult<ExtractedTour>
    where
        R: Read + Seek + Send + 'static,
    {
        let mapper = EntryMapper::new(&source.key);

        let mut metadata = ObjectMetadata::new();
        metadata.insert(META_ORIGINAL_ARCHIVE.to_string(), source.key.clone());
        metadata.insert(
            META_EXTRACTION_TIME.to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        metadata.insert(META_TOUR_NAME.to_string(), mapper.tour_name().to_string());

        let (tx, mut rx) = mpsc::channel::<ReadEntry>(READ_AHEAD);
        let walker = {
            let walk = ArchiveWalk {
                archive_key: source.key.clone(),
                mapper: mapper.clone(),
                max_entry_bytes: self.max_entry_bytes,
            };
            let span = tracing::Span::current();
            tokio::task::spawn_blocking(move || span.in_scope(|| walk.run(reader, tx)))
        };

        let mut entries: Vec<ExtractedEntry> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        while let Some((entry, data)) = rx.recv().await {
            self.storage
                .put(
                    &self.destination_bucket,
                    &entry.destination_key,
                    data,
                    &entry.content_type,
                    &metadata,
                )
                .await?;

            tracing::debug!(
                key = %entry.destination_key,
                size_bytes = entry.size,
                content_type = %entry.content_type,
                "Extracted entry"
            );

            // Same leaf as an earlier entry: the object was overwritten, keep one record
            match positions.get(&entry.destination_key) {
                Some(&position) => entries[position] = entry,
                None => {
                    positions.insert(entry.destination_key.clone(), entries.len());
                    entries.push(entry);
                }
            }
        }

        walker
            .await
            .map_err(|e| PipelineError::Io(io::Error::other(format!("archive reader: {}", e))))??;

        let tour = ExtractedTour::new(source, mapper.namespace(), entries);
        tracing::info!(
            namespace = %tour.namespace(),
            file_count = tour.entry_count(),
            total_size = tour.total_size(),
            "Archive extracted"
        );
        Ok(tour)
    }
}

/// Synchronous half of an extraction: decompresses entries and sends them on.
struct ArchiveWalk {
    archive_key: String,
    mapper: EntryMapper,
    max_entry_bytes: u64,
}

impl ArchiveWalk {
    fn run<R: Read + Seek>(&self, reader: R, tx: mpsc::Sender<ReadEntry>) -> PipelineResult<()> {
        let mut archive = ZipArchive::new(reader).map_err(|e| self.invalid(e.to_string()))?;
        tracing::info!(
            namespace = %self.mapper.namespace(),
            entries = archive.len(),
            "Extracting archive"
        );

        for index in 0..archive.len() {
            let Some(read) = self.read_entry(&mut archive, index)? else {
                continue;
            };
            // Receiver gone: the upload side already failed
            if tx.blocking_send(read).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn read_entry<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        index: usize,
    ) -> PipelineResult<Option<ReadEntry>> {
        let mut file = archive
            .by_index(index)
            .map_err(|e| self.invalid(format!("entry {}: {}", index, e)))?;

        let (destination_key, leaf, content_type) =
            match self.mapper.map_entry(file.name(), file.is_dir()) {
                EntryMapping::Extract {
                    destination_key,
                    leaf,
                    content_type,
                } => (destination_key, leaf, content_type),
                EntryMapping::Skip(reason) => {
                    tracing::debug!(entry = %file.name(), ?reason, "Skipping entry");
                    return Ok(None);
                }
            };

        let entry_name = file.name().to_string();
        let too_large = || PipelineError::EntryTooLarge {
            entry: entry_name.clone(),
            limit: self.max_entry_bytes,
        };
        if file.size() > self.max_entry_bytes {
            return Err(too_large());
        }

        let mut data = Vec::with_capacity(file.size() as usize);
        (&mut file)
            .take(self.max_entry_bytes + 1)
            .read_to_end(&mut data)
            .map_err(|e| self.invalid(format!("{}: {}", entry_name, e)))?;
        if data.len() as u64 > self.max_entry_bytes {
            return Err(too_large());
        }

        let entry = ExtractedEntry {
            filename: leaf,
            destination_key,
            size: data.len() as u64,
            content_type: content_type.to_string(),
        };
        Ok(Some((entry, data)))
    }

    fn invalid(&self, reason: String) -> PipelineError {
        PipelineError::InvalidArchive {
            archive: self.archive_key.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::{Cursor, SeekFrom, Write};
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};
    use tourpack_storage::MemoryStorage;
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    fn build_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, data) in files {
                if name.ends_with('/') {
                    zip.add_directory(*name, options).unwrap();
                } else {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(data).unwrap();
                }
            }
            zip.finish().unwrap();
        }
        buffer
    }

    fn extractor(storage: Arc<MemoryStorage>, limit: u64) -> ArchiveExtractor {
        ArchiveExtractor::new(storage, "tours-bucket", limit)
    }

    #[tokio::test]
    async fn writes_entries_with_metadata() {
        let storage = Arc::new(MemoryStorage::new());
        let zip = build_zip(&[
            ("site/", b""),
            ("site/index.html", b"<html></html>"),
            ("site/css/style.css", b"body{}"),
        ]);
        let source = SourceLocation::new("uploads", "incoming/Demo.zip");

        let tour = extractor(storage.clone(), 1024)
            .extract(Cursor::new(zip), &source)
            .await
            .unwrap();

        assert_eq!(tour.namespace(), "tours/Demo/");
        assert_eq!(tour.entry_count(), 2);
        assert_eq!(
            storage.keys("tours-bucket"),
            vec!["tours/Demo/index.html".to_string(), "tours/Demo/style.css".to_string()]
        );

        let stored = storage.get("tours-bucket", "tours/Demo/index.html").unwrap();
        assert_eq!(stored.data, b"<html></html>");
        assert_eq!(stored.content_type, "text/html");
        assert_eq!(stored.metadata["original_zip"], "incoming/Demo.zip");
        assert_eq!(stored.metadata["tour_name"], "Demo");
        assert!(stored.metadata.contains_key("extraction_time"));
    }

    #[tokio::test]
    async fn corrupt_archive_writes_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let source = SourceLocation::new("uploads", "broken.zip");

        let err = extractor(storage.clone(), 1024)
            .extract(Cursor::new(b"definitely not a zip".to_vec()), &source)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidArchive { .. }));
        assert_eq!(storage.put_count(), 0);
    }

    #[tokio::test]
    async fn oversized_entry_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let zip = build_zip(&[("small.txt", b"ok"), ("big.bin", &[0u8; 64])]);
        let source = SourceLocation::new("uploads", "t.zip");

        let err = extractor(storage.clone(), 16)
            .extract(Cursor::new(zip), &source)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EntryTooLarge { ref entry, limit: 16 } if entry == "big.bin"));
        // Entries before the failure stay written
        assert_eq!(storage.keys("tours-bucket"), vec!["tours/t/small.txt".to_string()]);
    }

    #[tokio::test]
    async fn storage_failure_surfaces_as_storage_io() {
        let storage = Arc::new(MemoryStorage::new());
        storage.fail_puts(true);
        let zip = build_zip(&[("index.html", b"x")]);
        let source = SourceLocation::new("uploads", "t.zip");

        let err = extractor(storage, 1024)
            .extract(Cursor::new(zip), &source)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::StorageIo(_)));
    }

    /// Reader that records which threads touch it
    struct ThreadTracking {
        inner: Cursor<Vec<u8>>,
        threads: Arc<Mutex<HashSet<ThreadId>>>,
    }

    impl Read for ThreadTracking {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.threads.lock().unwrap().insert(thread::current().id());
            self.inner.read(buf)
        }
    }

    impl Seek for ThreadTracking {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.threads.lock().unwrap().insert(thread::current().id());
            self.inner.seek(pos)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn archive_is_read_off_the_runtime_thread() {
        let storage = Arc::new(MemoryStorage::new());
        let zip = build_zip(&[("index.html", b"<html>"), ("pano.jpg", &[1u8; 512])]);
        let threads = Arc::new(Mutex::new(HashSet::new()));
        let reader = ThreadTracking {
            inner: Cursor::new(zip),
            threads: threads.clone(),
        };
        let source = SourceLocation::new("uploads", "t.zip");

        let tour = extractor(storage, 1024).extract(reader, &source).await.unwrap();

        assert_eq!(tour.entry_count(), 2);
        let threads = threads.lock().unwrap();
        assert!(!threads.is_empty());
        assert!(!threads.contains(&thread::current().id()));
    }

    #[tokio::test]
    async fn manifest_keeps_one_record_per_key() {
        let storage = Arc::new(MemoryStorage::new());
        let zip = build_zip(&[
            ("a/x.html", b"first"),
            ("y.css", b"y"),
            ("b/x.html", b"second!"),
        ]);
        let source = SourceLocation::new("uploads", "t.zip");

        let tour = extractor(storage.clone(), 1024)
            .extract(Cursor::new(zip), &source)
            .await
            .unwrap();

        let keys: Vec<_> = tour.entries().iter().map(|e| e.destination_key.as_str()).collect();
        assert_eq!(keys, vec!["tours/t/x.html", "tours/t/y.css"]);
        assert_eq!(tour.entries()[0].size, 7);
        assert_eq!(storage.get("tours-bucket", "tours/t/x.html").unwrap().data, b"second!");
    }
}
