//! Wire shapes of the pub/sub message and the webhook envelope.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tourpack_core::models::{ExtractedEntry, ExtractedTour, TourMetadata};

pub const COMPLETION_SUBJECT: &str = "Tour ZIP Processing Complete";
pub const ERROR_SUBJECT: &str = "Tour ZIP Processing Failed";
pub const BATCH_SUBJECT: &str = "Tour ZIP Batch Processed";

const UNKNOWN_SOURCE: &str = "unknown";
const FAILED_TOUR_NAME: &str = "processing_failed";

/// A notification handed to the gateway
#[derive(Debug, Clone)]
pub enum Notification {
    /// Every upload in the batch was extracted
    Completion { tours: Vec<ExtractedTour> },
    /// The batch failed; `event_data` is the raw trigger
    Error {
        error: String,
        event_data: Value,
        source_file: Option<String>,
    },
    /// Several tours reported to the webhook in one request
    Batch { tours: Vec<ExtractedTour> },
}

impl Notification {
    pub fn subject(&self) -> &'static str {
        match self {
            Notification::Completion { .. } => COMPLETION_SUBJECT,
            Notification::Error { .. } => ERROR_SUBJECT,
            Notification::Batch { .. } => BATCH_SUBJECT,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Completion { .. } => "completion",
            Notification::Error { .. } => "error",
            Notification::Batch { .. } => "batch",
        }
    }
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct TourSummary<'a> {
    tour_directory: &'a str,
    file_count: usize,
    files: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(tag = "event")]
enum PubSubMessage<'a> {
    #[serde(rename = "tour_zip_processed")]
    Processed {
        timestamp: String,
        processed_count: usize,
        tours: Vec<TourSummary<'a>>,
    },
    #[serde(rename = "tour_zip_processing_failed")]
    Failed {
        timestamp: String,
        error: &'a str,
        event_data: &'a Value,
    },
}

/// Pub/sub message body for `notification`.
pub fn pubsub_message(notification: &Notification, at: DateTime<Utc>) -> Value {
    let message = match notification {
        Notification::Completion { tours } | Notification::Batch { tours } => {
            PubSubMessage::Processed {
                timestamp: timestamp(at),
                processed_count: tours.len(),
                tours: tours
                    .iter()
                    .map(|tour| TourSummary {
                        tour_directory: tour.namespace(),
                        file_count: tour.entry_count(),
                        files: tour.entries().iter().map(|e| e.filename.as_str()).collect(),
                    })
                    .collect(),
            }
        }
        Notification::Error {
            error, event_data, ..
        } => PubSubMessage::Failed {
            timestamp: timestamp(at),
            error,
            event_data,
        },
    };
    serde_json::to_value(message).unwrap_or(Value::Null)
}

/// Webhook `data` for one extracted tour
#[derive(Debug, Clone, Serialize)]
pub struct TourData {
    pub tour_name: String,
    pub source_file: String,
    pub tour_path: String,
    pub file_count: usize,
    pub metadata: TourMetadata,
    pub processing_status: &'static str,
    pub files: Vec<ExtractedEntry>,
}

impl TourData {
    pub fn from_tour(tour: &ExtractedTour) -> Self {
        Self {
            tour_name: tour.tour_name().to_string(),
            source_file: tour.source_file().to_string(),
            tour_path: tour.namespace().to_string(),
            file_count: tour.entry_count(),
            metadata: TourMetadata::from_tour(tour),
            processing_status: "completed",
            files: tour.entries().to_vec(),
        }
    }
}

#[derive(Serialize)]
struct ErrorData<'a> {
    tour_name: &'static str,
    source_file: &'a str,
    error_message: &'a str,
    processing_status: &'static str,
    event_data: &'a Value,
    timestamp: String,
}

#[derive(Serialize)]
struct BatchData {
    batch_id: String,
    processed_count: usize,
    tours: Vec<TourData>,
    processing_status: &'static str,
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    action: &'static str,
    timestamp: String,
    source: &'static str,
    data: T,
}

fn envelope<T: Serialize>(data: T, at: DateTime<Utc>) -> Value {
    serde_json::to_value(Envelope {
        action: "tour_processed",
        timestamp: timestamp(at),
        source: "aws_lambda",
        data,
    })
    .unwrap_or(Value::Null)
}

/// One webhook envelope per tour
pub fn tour_envelopes(tours: &[ExtractedTour], at: DateTime<Utc>) -> Vec<Value> {
    tours
        .iter()
        .map(|tour| envelope(TourData::from_tour(tour), at))
        .collect()
}

pub fn error_envelope(
    error: &str,
    event_data: &Value,
    source_file: Option<&str>,
    at: DateTime<Utc>,
) -> Value {
    envelope(
        ErrorData {
            tour_name: FAILED_TOUR_NAME,
            source_file: source_file.unwrap_or(UNKNOWN_SOURCE),
            error_message: error,
            processing_status: "failed",
            event_data,
            timestamp: timestamp(at),
        },
        at,
    )
}

/// Single envelope covering every tour; `batch_id` is 16 hex characters.
pub fn batch_envelope(tours: &[ExtractedTour], at: DateTime<Utc>) -> Value {
    let mut batch_id = uuid::Uuid::new_v4().simple().to_string();
    batch_id.truncate(16);
    envelope(
        BatchData {
            batch_id,
            processed_count: tours.len(),
            tours: tours.iter().map(TourData::from_tour).collect(),
            processing_status: "batch_completed",
        },
        at,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tourpack_core::models::SourceLocation;

    fn tour() -> ExtractedTour {
        let source = SourceLocation::new("uploads", "Demo Tour.zip");
        ExtractedTour::new(
            &source,
            "tours/Demo Tour/",
            vec![ExtractedEntry {
                filename: "index.html".to_string(),
                destination_key: "tours/Demo Tour/index.html".to_string(),
                size: 12,
                content_type: "text/html".to_string(),
            }],
        )
    }

    #[test]
    fn completion_pubsub_message() {
        let notification = Notification::Completion { tours: vec![tour()] };
        let message = pubsub_message(&notification, Utc::now());

        assert_eq!(message["event"], "tour_zip_processed");
        assert_eq!(message["processed_count"], 1);
        assert_eq!(message["tours"][0]["tour_directory"], "tours/Demo Tour/");
        assert_eq!(message["tours"][0]["file_count"], 1);
        assert_eq!(message["tours"][0]["files"], json!(["index.html"]));
        assert_eq!(notification.subject(), "Tour ZIP Processing Complete");
    }

    #[test]
    fn error_pubsub_message_carries_trigger() {
        let event = json!({"Records": []});
        let notification = Notification::Error {
            error: "boom".to_string(),
            event_data: event.clone(),
            source_file: None,
        };
        let message = pubsub_message(&notification, Utc::now());

        assert_eq!(message["event"], "tour_zip_processing_failed");
        assert_eq!(message["error"], "boom");
        assert_eq!(message["event_data"], event);
        assert_eq!(notification.subject(), "Tour ZIP Processing Failed");
    }

    #[test]
    fn tour_envelope_shape() {
        let envelopes = tour_envelopes(&[tour()], Utc::now());
        assert_eq!(envelopes.len(), 1);
        let body = &envelopes[0];

        assert_eq!(body["action"], "tour_processed");
        assert_eq!(body["source"], "aws_lambda");
        assert_eq!(body["data"]["tour_name"], "Demo Tour");
        assert_eq!(body["data"]["tour_path"], "tours/Demo Tour/");
        assert_eq!(body["data"]["source_file"], "s3://uploads/Demo Tour.zip");
        assert_eq!(body["data"]["processing_status"], "completed");
        assert_eq!(body["data"]["metadata"]["entry_point"], "index.html");
        assert_eq!(body["data"]["files"][0]["s3_key"], "tours/Demo Tour/index.html");
    }

    #[test]
    fn error_envelope_defaults_source() {
        let body = error_envelope("bad", &json!({}), None, Utc::now());
        assert_eq!(body["data"]["tour_name"], "processing_failed");
        assert_eq!(body["data"]["source_file"], "unknown");
        assert_eq!(body["data"]["error_message"], "bad");
        assert_eq!(body["data"]["processing_status"], "failed");
    }

    #[test]
    fn batch_envelope_shape() {
        let body = batch_envelope(&[tour(), tour()], Utc::now());
        assert_eq!(body["data"]["processed_count"], 2);
        assert_eq!(body["data"]["processing_status"], "batch_completed");
        assert_eq!(body["data"]["batch_id"].as_str().unwrap().len(), 16);
        assert_eq!(body["data"]["tours"].as_array().unwrap().len(), 2);
    }
}
