pub mod event;
pub mod metadata;
pub mod outcome;
pub mod response;

pub use event::{
    unescape_object_key, S3EventNotification, S3EventRecord, SourceLocation, UploadEvent,
};
pub use metadata::{CategoryStats, FileCategory, TourMetadata};
pub use outcome::{BatchResult, ExtractedEntry, ExtractedTour, ExtractionOutcome, FailedExtraction};
pub use response::{InvocationResponse, ResponseBody};
