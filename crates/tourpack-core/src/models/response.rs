//! Invocation response returned to the trigger.

use serde::Serialize;

use crate::models::outcome::BatchResult;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Completed {
        message: String,
        results: BatchResult,
    },
    Failed {
        error: String,
        message: String,
    },
}

/// `{statusCode, body}` envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl InvocationResponse {
    /// The batch was processed; individual outcomes may still have failed.
    pub fn completed(results: BatchResult) -> Self {
        Self {
            status_code: 200,
            body: ResponseBody::Completed {
                message: "Tour ZIP processing completed".to_string(),
                results,
            },
        }
    }

    /// The invocation itself failed before any per-event handling could finish.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: ResponseBody::Failed {
                error: "Tour ZIP processing failed".to_string(),
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
