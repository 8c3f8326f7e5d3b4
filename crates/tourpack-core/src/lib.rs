//! Tourpack Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration shared by
//! every tourpack component: the storage backends, the notification infrastructure and
//! the extraction worker.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, LogFormat, WebhookConfig};
pub use error::{ErrorKind, LogLevel, PipelineError, PipelineResult};
pub use storage_types::StorageBackend;
