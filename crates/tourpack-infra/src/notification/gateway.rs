use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::payload::{
    batch_envelope, error_envelope, pubsub_message, tour_envelopes, Notification,
};
use crate::pubsub::Publisher;
#[cfg(feature = "webhook")]
use crate::webhook::WebhookClient;

/// Result of one sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
    /// The sink is not configured
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub pubsub: DeliveryStatus,
    pub webhook: DeliveryStatus,
}

impl DeliveryReport {
    /// At least one sink delivered and none failed.
    pub fn delivered(&self) -> bool {
        let statuses = [self.pubsub, self.webhook];
        !statuses.contains(&DeliveryStatus::Failed)
            && statuses.contains(&DeliveryStatus::Delivered)
    }
}

/// Fans a [`Notification`] out to the pub/sub topic and the webhook.
///
/// Both sinks are best effort: failures are logged and reported, never returned as
/// errors.
#[derive(Clone, Default)]
pub struct NotificationGateway {
    publisher: Option<Arc<dyn Publisher>>,
    topic: Option<String>,
    #[cfg(feature = "webhook")]
    webhook: Option<WebhookClient>,
}

impl NotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>, topic: impl Into<String>) -> Self {
        self.publisher = Some(publisher);
        self.topic = Some(topic.into());
        self
    }

    #[cfg(feature = "webhook")]
    pub fn with_webhook(mut self, client: WebhookClient) -> Self {
        self.webhook = Some(client);
        self
    }

    #[tracing::instrument(skip(self, notification), fields(kind = notification.kind()))]
    pub async fn notify(&self, notification: &Notification) -> DeliveryReport {
        let report = DeliveryReport {
            pubsub: self.publish(notification).await,
            webhook: self.post_webhook(notification).await,
        };

        if report.delivered() {
            tracing::info!(pubsub = ?report.pubsub, webhook = ?report.webhook, "Notification delivered");
        } else {
            tracing::warn!(pubsub = ?report.pubsub, webhook = ?report.webhook, "Notification not fully delivered");
        }
        report
    }

    async fn publish(&self, notification: &Notification) -> DeliveryStatus {
        let (Some(publisher), Some(topic)) = (&self.publisher, &self.topic) else {
            tracing::debug!("No notification topic configured");
            return DeliveryStatus::Skipped;
        };

        let message = pubsub_message(notification, Utc::now()).to_string();
        match publisher
            .publish(topic, &message, notification.subject())
            .await
        {
            Ok(()) => DeliveryStatus::Delivered,
            Err(e) => {
                tracing::error!(error = %e, topic = %topic, "Failed to publish notification");
                DeliveryStatus::Failed
            }
        }
    }

    fn webhook_bodies(&self, notification: &Notification) -> Vec<Value> {
        let now = Utc::now();
        match notification {
            Notification::Completion { tours } => tour_envelopes(tours, now),
            Notification::Batch { tours } => vec![batch_envelope(tours, now)],
            Notification::Error {
                error,
                event_data,
                source_file,
            } => vec![error_envelope(error, event_data, source_file.as_deref(), now)],
        }
    }

    #[cfg(feature = "webhook")]
    async fn post_webhook(&self, notification: &Notification) -> DeliveryStatus {
        let Some(client) = &self.webhook else {
            tracing::debug!("No webhook configured");
            return DeliveryStatus::Skipped;
        };

        let bodies = self.webhook_bodies(notification);
        if bodies.is_empty() {
            return DeliveryStatus::Skipped;
        }

        let mut status = DeliveryStatus::Delivered;
        for body in &bodies {
            if let Err(e) = client.send(body).await {
                tracing::error!(error = %e, url = %client.url(), "Webhook notification failed");
                status = DeliveryStatus::Failed;
            }
        }
        status
    }

    #[cfg(not(feature = "webhook"))]
    async fn post_webhook(&self, notification: &Notification) -> DeliveryStatus {
        let _ = self.webhook_bodies(notification);
        DeliveryStatus::Skipped
    }
}
