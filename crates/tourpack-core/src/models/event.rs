//! Storage upload notifications.
//!
//! The trigger is a batch of S3-style records. Object keys arrive URL-escaped with
//! `+` standing for a space and are unescaped once, here, before anything else uses
//! them.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, PipelineResult};

/// Raw notification batch as delivered by the storage service
#[derive(Debug, Clone, Deserialize)]
pub struct S3EventNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventSource", default)]
    pub event_source: Option<String>,
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: u64,
}

/// Bucket + key identifying one stored object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub bucket: String,
    pub key: String,
}

impl SourceLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// One upload to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    pub event_source: String,
    pub source: SourceLocation,
    pub size: u64,
}

impl UploadEvent {
    pub fn new(event_source: impl Into<String>, source: SourceLocation, size: u64) -> Self {
        Self {
            event_source: event_source.into(),
            source,
            size,
        }
    }
}

/// Unescape an object key from a notification (`+` is a space, `%XX` is a byte).
///
/// Byte sequences that are not UTF-8 become U+FFFD; such a key names no stored object
/// and fails at download, for that event only.
pub fn unescape_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

impl S3EventNotification {
    /// Parse a raw trigger payload.
    pub fn from_value(value: &serde_json::Value) -> PipelineResult<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| PipelineError::InvalidEvent(e.to_string()))
    }

    /// Convert every record into an [`UploadEvent`], preserving order.
    ///
    /// A record without an `s3` section cannot be attributed to any object and makes
    /// the whole trigger invalid.
    pub fn upload_events(&self) -> PipelineResult<Vec<UploadEvent>> {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| record.to_upload_event(index))
            .collect()
    }

    /// `s3://bucket/key` of the first storage record, escaped key as received.
    pub fn first_source_file(&self) -> Option<String> {
        self.records.iter().find_map(|record| {
            let s3 = record.s3.as_ref()?;
            if record.event_source.as_deref() != Some(crate::constants::S3_EVENT_SOURCE) {
                return None;
            }
            Some(format!("s3://{}/{}", s3.bucket.name, s3.object.key))
        })
    }
}

impl S3EventRecord {
    fn to_upload_event(&self, index: usize) -> PipelineResult<UploadEvent> {
        let s3 = self.s3.as_ref().ok_or_else(|| {
            PipelineError::InvalidEvent(format!("record {index} has no s3 section"))
        })?;
        Ok(UploadEvent::new(
            self.event_source.clone().unwrap_or_default(),
            SourceLocation::new(s3.bucket.name.clone(), unescape_object_key(&s3.object.key)),
            s3.object.size,
        ))
    }
}
