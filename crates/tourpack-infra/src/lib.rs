//! Tourpack Infrastructure
//!
//! Cross-cutting pieces the worker depends on but does not own: tracing setup,
//! webhook signing and delivery, pub/sub publishing and the notification gateway
//! that drives both sinks.

pub mod notification;
pub mod pubsub;
pub mod signature;
#[cfg(feature = "observability-basic")]
pub mod telemetry;
#[cfg(feature = "webhook")]
pub mod webhook;

pub use notification::{DeliveryReport, DeliveryStatus, Notification, NotificationGateway};
#[cfg(feature = "pubsub-sns")]
pub use pubsub::SnsPublisher;
pub use pubsub::Publisher;
pub use signature::{canonical_json, sign_payload, verify_signature};
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};
#[cfg(feature = "webhook")]
pub use webhook::{WebhookClient, WebhookResponse};
