use serde_json::Value;
use tourpack_core::models::{InvocationResponse, S3EventNotification};
use tourpack_infra::{DeliveryReport, NotificationGateway};

use crate::aggregator::{aggregate, NotificationDecision};
use crate::dispatcher::EventDispatcher;

/// Entry point for one trigger invocation
pub struct TourProcessor {
    dispatcher: EventDispatcher,
    gateway: NotificationGateway,
    batch_mode: bool,
}

impl TourProcessor {
    pub fn new(dispatcher: EventDispatcher, gateway: NotificationGateway) -> Self {
        Self {
            dispatcher,
            gateway,
            batch_mode: false,
        }
    }

    /// Announce clean batches as a single batch notification.
    pub fn with_batch_mode(mut self, enabled: bool) -> Self {
        self.batch_mode = enabled;
        self
    }

    /// Handle a raw trigger payload.
    ///
    /// A payload that cannot be read as a batch of upload records yields a 500 and an
    /// error notification. Otherwise the response is 200 and carries one outcome per
    /// record, failed ones included.
    #[tracing::instrument(skip_all)]
    pub async fn handle(&self, event: Value) -> InvocationResponse {
        let events = match S3EventNotification::from_value(&event).and_then(|n| n.upload_events()) {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(error = %e, "Rejected trigger payload");
                let decision = NotificationDecision::Error {
                    error: e.to_string(),
                    event_data: event,
                };
                self.notify(decision).await;
                return InvocationResponse::failed(e.to_string());
            }
        };

        tracing::info!(records = events.len(), "Processing upload batch");
        let batch = self.dispatcher.handle_batch(events).await;
        self.notify(aggregate(&batch, &event)).await;

        InvocationResponse::completed(batch)
    }

    async fn notify(&self, decision: NotificationDecision) -> DeliveryReport {
        self.gateway
            .notify(&decision.into_notification(self.batch_mode))
            .await
    }
}
