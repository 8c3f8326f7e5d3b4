//! Batch outcome → notification decision.
//!
//! The decision is all or nothing: a single failed outcome means the batch reports an
//! error, and none of the tours that did extract are announced as complete.

use serde_json::Value;
use tourpack_core::models::{BatchResult, ExtractedTour, S3EventNotification};
use tourpack_infra::Notification;

pub const EMPTY_BATCH_ERROR: &str = "No upload events in batch";

#[derive(Debug, Clone)]
pub enum NotificationDecision {
    Completion(Vec<ExtractedTour>),
    Error { error: String, event_data: Value },
}

impl NotificationDecision {
    pub fn is_completion(&self) -> bool {
        matches!(self, NotificationDecision::Completion(_))
    }

    /// Gateway notification for this decision; error notifications name the first
    /// storage record of the trigger. In batch mode a completion is reported as one
    /// batch notification.
    pub fn into_notification(self, batch_mode: bool) -> Notification {
        match self {
            NotificationDecision::Completion(tours) if batch_mode => Notification::Batch { tours },
            NotificationDecision::Completion(tours) => Notification::Completion { tours },
            NotificationDecision::Error { error, event_data } => {
                let source_file = S3EventNotification::from_value(&event_data)
                    .ok()
                    .and_then(|n| n.first_source_file());
                Notification::Error {
                    error,
                    event_data,
                    source_file,
                }
            }
        }
    }
}

pub fn aggregate(batch: &BatchResult, raw_event: &Value) -> NotificationDecision {
    if batch.all_succeeded() {
        return NotificationDecision::Completion(batch.tours().cloned().collect());
    }

    let error = batch
        .first_failure()
        .map(|failure| failure.error.clone())
        .unwrap_or_else(|| EMPTY_BATCH_ERROR.to_string());

    NotificationDecision::Error {
        error,
        event_data: raw_event.clone(),
    }
}
