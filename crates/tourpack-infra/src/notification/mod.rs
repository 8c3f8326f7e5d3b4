//! Outcome notifications: payload shapes and the two-sink gateway.

mod gateway;
pub mod payload;

pub use gateway::{DeliveryReport, DeliveryStatus, NotificationGateway};
pub use payload::Notification;
