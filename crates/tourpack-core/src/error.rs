//! Error types module
//!
//! All pipeline failures are unified under [`PipelineError`]. Errors raised while
//! handling one upload event are captured into that event's outcome; only a malformed
//! trigger aborts the whole invocation.

use serde::Serialize;
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected rejections such as a non-archive upload
    Debug,
    /// Recoverable problems such as a failed notification
    Warn,
    /// Unexpected failures
    Error,
}

/// Machine-readable classification of a [`PipelineError`], carried in failed outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidArchive,
    NotAnArchive,
    #[serde(rename = "STORAGE_IO_ERROR")]
    StorageIo,
    #[serde(rename = "NOTIFICATION_DELIVERY_ERROR")]
    NotificationDelivery,
    ArchiveTooLarge,
    EntryTooLarge,
    InvalidEvent,
    #[serde(rename = "CONFIG_ERROR")]
    Config,
    #[serde(rename = "IO_ERROR")]
    Io,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::InvalidArchive,
        ErrorKind::NotAnArchive,
        ErrorKind::StorageIo,
        ErrorKind::NotificationDelivery,
        ErrorKind::ArchiveTooLarge,
        ErrorKind::EntryTooLarge,
        ErrorKind::InvalidEvent,
        ErrorKind::Config,
        ErrorKind::Io,
    ];

    /// Machine-readable code, identical to the serialized form
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArchive => "INVALID_ARCHIVE",
            ErrorKind::NotAnArchive => "NOT_AN_ARCHIVE",
            ErrorKind::StorageIo => "STORAGE_IO_ERROR",
            ErrorKind::NotificationDelivery => "NOTIFICATION_DELIVERY_ERROR",
            ErrorKind::ArchiveTooLarge => "ARCHIVE_TOO_LARGE",
            ErrorKind::EntryTooLarge => "ENTRY_TOO_LARGE",
            ErrorKind::InvalidEvent => "INVALID_EVENT",
            ErrorKind::Config => "CONFIG_ERROR",
            ErrorKind::Io => "IO_ERROR",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid ZIP file: {archive} ({reason})")]
    InvalidArchive { archive: String, reason: String },

    #[error("File is not a ZIP: {0}")]
    NotAnArchive(String),

    #[error("Storage error: {0}")]
    StorageIo(String),

    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(String),

    #[error("Archive {archive} is {size} bytes, exceeding the limit of {limit} bytes")]
    ArchiveTooLarge {
        archive: String,
        size: u64,
        limit: u64,
    },

    #[error("Entry {entry} exceeds the per-entry limit of {limit} bytes")]
    EntryTooLarge { entry: String, limit: u64 },

    #[error("Invalid trigger event: {0}")]
    InvalidEvent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidArchive { .. } => ErrorKind::InvalidArchive,
            PipelineError::NotAnArchive(_) => ErrorKind::NotAnArchive,
            PipelineError::StorageIo(_) => ErrorKind::StorageIo,
            PipelineError::NotificationDelivery(_) => ErrorKind::NotificationDelivery,
            PipelineError::ArchiveTooLarge { .. } => ErrorKind::ArchiveTooLarge,
            PipelineError::EntryTooLarge { .. } => ErrorKind::EntryTooLarge,
            PipelineError::InvalidEvent(_) => ErrorKind::InvalidEvent,
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::Io(_) => ErrorKind::Io,
        }
    }

    /// Machine-readable error code (e.g. "INVALID_ARCHIVE")
    pub fn error_code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            PipelineError::NotAnArchive(_) => LogLevel::Debug,
            PipelineError::NotificationDelivery(_)
            | PipelineError::ArchiveTooLarge { .. }
            | PipelineError::EntryTooLarge { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_follow_kind() {
        let err = PipelineError::InvalidArchive {
            archive: "tour.zip".to_string(),
            reason: "bad header".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidArchive);
        assert_eq!(err.error_code(), "INVALID_ARCHIVE");

        let err = PipelineError::StorageIo("timeout".to_string());
        assert_eq!(err.error_code(), "STORAGE_IO_ERROR");
    }

    #[test]
    fn not_an_archive_is_debug_level() {
        let err = PipelineError::NotAnArchive("uploads/readme.txt".to_string());
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert_eq!(err.to_string(), "File is not a ZIP: uploads/readme.txt");
    }

    #[test]
    fn error_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::NotAnArchive).unwrap();
        assert_eq!(json, "\"NOT_AN_ARCHIVE\"");
    }

    #[test]
    fn serialized_kind_matches_error_code() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.code(), "{:?}", kind);
        }

        let err = PipelineError::Io(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(serde_json::to_value(err.kind()).unwrap(), err.error_code());
        let err = PipelineError::Config("bad".to_string());
        assert_eq!(serde_json::to_value(err.kind()).unwrap(), "CONFIG_ERROR");
    }
}
