//! Wiring of the processor from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use tourpack_core::Config;
use tourpack_infra::{NotificationGateway, SnsPublisher, WebhookClient};
use tourpack_storage::create_storage;

use crate::dispatcher::EventDispatcher;
use crate::handler::TourProcessor;

/// Build the notification gateway; unset sinks are left out.
pub async fn build_gateway(config: &Config) -> Result<NotificationGateway> {
    let mut gateway = NotificationGateway::new();

    if let Some(topic) = &config.notification_topic_arn {
        let publisher = SnsPublisher::new(config.aws_region.clone()).await;
        gateway = gateway.with_publisher(Arc::new(publisher), topic.clone());
    }

    if let Some(client) =
        WebhookClient::from_config(&config.webhook).context("Failed to configure webhook")?
    {
        gateway = gateway.with_webhook(client);
    }

    Ok(gateway)
}

pub async fn build_processor(config: &Config) -> Result<TourProcessor> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialise storage backend")?;

    tracing::info!(
        backend = %storage.backend_type(),
        bucket = %config.destination_bucket,
        max_archive_bytes = config.max_archive_bytes,
        max_concurrent_extractions = config.max_concurrent_extractions,
        "Storage initialised"
    );

    let dispatcher = EventDispatcher::new(storage, config);
    let gateway = build_gateway(config).await?;
    Ok(TourProcessor::new(dispatcher, gateway).with_batch_mode(config.webhook.batch_mode))
}
