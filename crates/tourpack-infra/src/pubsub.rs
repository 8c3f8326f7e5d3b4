//! Internal pub/sub sink.

use async_trait::async_trait;
use tourpack_core::{PipelineError, PipelineResult};

/// Publishes a message with a subject line to a topic
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, message: &str, subject: &str) -> PipelineResult<()>;
}

#[cfg(feature = "pubsub-sns")]
pub use sns::SnsPublisher;

#[cfg(feature = "pubsub-sns")]
mod sns {
    use super::*;
    use aws_config::meta::region::RegionProviderChain;
    use aws_config::BehaviorVersion;
    use aws_sdk_sns::Client;

    /// SNS-backed [`Publisher`]
    #[derive(Clone)]
    pub struct SnsPublisher {
        client: Client,
    }

    impl SnsPublisher {
        /// Create a publisher using the SDK's default credential chain.
        pub async fn new(region: Option<String>) -> Self {
            let region_provider =
                RegionProviderChain::first_try(region.map(aws_config::Region::new))
                    .or_default_provider();

            let config = aws_config::defaults(BehaviorVersion::latest())
                .region(region_provider)
                .load()
                .await;

            SnsPublisher {
                client: Client::new(&config),
            }
        }
    }

    #[async_trait]
    impl Publisher for SnsPublisher {
        async fn publish(&self, topic: &str, message: &str, subject: &str) -> PipelineResult<()> {
            let start = std::time::Instant::now();

            let output = self
                .client
                .publish()
                .topic_arn(topic)
                .message(message)
                .subject(subject)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        topic = %topic,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "SNS publish failed"
                    );
                    PipelineError::NotificationDelivery(e.to_string())
                })?;

            tracing::info!(
                topic = %topic,
                message_id = output.message_id().unwrap_or_default(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "SNS publish successful"
            );

            Ok(())
        }
    }
}
