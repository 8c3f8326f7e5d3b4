//! Configuration module
//!
//! Configuration is environment-sourced. Only the destination bucket is mandatory;
//! every notification sink is optional and silently skipped when unset.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_ARCHIVE_BYTES, DEFAULT_MAX_ENTRY_BYTES};
use crate::storage_types::StorageBackend;

const MAX_CONCURRENT_EXTRACTIONS: usize = 1;
const WEBHOOK_NOTIFY_TIMEOUT_SECS: u64 = 30;
const WEBHOOK_STATUS_TIMEOUT_SECS: u64 = 10;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Webhook sink configuration
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub secret: Option<String>,
    /// Send one batch payload per invocation instead of one payload per tour.
    pub batch_mode: bool,
    pub notify_timeout: Duration,
    pub status_timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            secret: None,
            batch_mode: false,
            notify_timeout: Duration::from_secs(WEBHOOK_NOTIFY_TIMEOUT_SECS),
            status_timeout: Duration::from_secs(WEBHOOK_STATUS_TIMEOUT_SECS),
        }
    }
}

impl WebhookConfig {
    /// Read the webhook variables, accepting the legacy `WORDPRESS_*` names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());
        let var_or = |primary: &str, legacy: &str| var(primary).or_else(|| var(legacy));

        Ok(WebhookConfig {
            url: var_or("WEBHOOK_URL", "WORDPRESS_WEBHOOK_URL"),
            api_key: var_or("WEBHOOK_API_KEY", "WORDPRESS_API_KEY"),
            secret: var_or("WEBHOOK_SECRET", "WORDPRESS_SECRET"),
            batch_mode: var("WEBHOOK_BATCH_MODE")
                .map(|s| s.to_lowercase().parse().unwrap_or(false))
                .unwrap_or(false),
            notify_timeout: Duration::from_secs(parse_or(
                "WEBHOOK_TIMEOUT_SECS",
                var("WEBHOOK_TIMEOUT_SECS"),
                WEBHOOK_NOTIFY_TIMEOUT_SECS,
            )?),
            status_timeout: Duration::from_secs(parse_or(
                "WEBHOOK_STATUS_TIMEOUT_SECS",
                var("WEBHOOK_STATUS_TIMEOUT_SECS"),
                WEBHOOK_STATUS_TIMEOUT_SECS,
            )?),
        })
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }
}

/// Parse a numeric variable, falling back to `default` only when it is unset.
fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a number, got {:?}: {}", name, raw, e)),
        None => Ok(default),
    }
}

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct Config {
    // Storage configuration
    pub destination_bucket: String,
    pub storage_backend: StorageBackend,
    pub aws_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    // Notification configuration
    pub notification_topic_arn: Option<String>,
    pub webhook: WebhookConfig,
    // Extraction limits
    pub max_archive_bytes: u64,
    pub max_entry_bytes: u64,
    pub max_concurrent_extractions: usize,
    pub scratch_dir: PathBuf,
    pub log_format: LogFormat,
}

impl Config {
    /// Configuration with defaults for everything except the destination bucket.
    pub fn new(destination_bucket: impl Into<String>) -> Self {
        Self {
            destination_bucket: destination_bucket.into(),
            storage_backend: StorageBackend::S3,
            aws_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            notification_topic_arn: None,
            webhook: WebhookConfig::default(),
            max_archive_bytes: DEFAULT_MAX_ARCHIVE_BYTES,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            max_concurrent_extractions: MAX_CONCURRENT_EXTRACTIONS,
            scratch_dir: env::temp_dir(),
            log_format: LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup (the process environment
    /// in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());
        let var_or = |primary: &str, legacy: &str| var(primary).or_else(|| var(legacy));

        let destination_bucket = var("TOURS_BUCKET")
            .ok_or_else(|| anyhow::anyhow!("TOURS_BUCKET must be set"))?;

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(s) => s.parse()?,
            None => StorageBackend::S3,
        };

        let log_format = match var("LOG_FORMAT").map(|s| s.to_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let config = Config {
            destination_bucket,
            storage_backend,
            aws_region: var_or("AWS_REGION", "S3_REGION"),
            s3_endpoint: var("S3_ENDPOINT"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            notification_topic_arn: var("NOTIFICATION_TOPIC_ARN"),
            webhook: WebhookConfig::from_lookup(&lookup)?,
            max_archive_bytes: parse_or(
                "MAX_ARCHIVE_SIZE_BYTES",
                var("MAX_ARCHIVE_SIZE_BYTES"),
                DEFAULT_MAX_ARCHIVE_BYTES,
            )?,
            max_entry_bytes: parse_or(
                "MAX_ENTRY_SIZE_BYTES",
                var("MAX_ENTRY_SIZE_BYTES"),
                DEFAULT_MAX_ENTRY_BYTES,
            )?,
            max_concurrent_extractions: parse_or(
                "MAX_CONCURRENT_EXTRACTIONS",
                var("MAX_CONCURRENT_EXTRACTIONS"),
                MAX_CONCURRENT_EXTRACTIONS,
            )?,
            scratch_dir: var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.destination_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("TOURS_BUCKET must not be empty"));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        if self.max_archive_bytes == 0 || self.max_entry_bytes == 0 {
            return Err(anyhow::anyhow!(
                "MAX_ARCHIVE_SIZE_BYTES and MAX_ENTRY_SIZE_BYTES must be greater than zero"
            ));
        }

        if self.max_concurrent_extractions == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_EXTRACTIONS must be at least 1"
            ));
        }

        if let Some(url) = &self.webhook.url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(anyhow::anyhow!("WEBHOOK_URL must be an http(s) URL"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn requires_destination_bucket() {
        let result = Config::from_lookup(lookup(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("TOURS_BUCKET", "tours-bucket")])).unwrap();
        assert_eq!(config.destination_bucket, "tours-bucket");
        assert_eq!(config.storage_backend, StorageBackend::S3);
        assert_eq!(config.max_archive_bytes, DEFAULT_MAX_ARCHIVE_BYTES);
        assert_eq!(config.max_concurrent_extractions, 1);
        assert!(config.webhook.url.is_none());
        assert!(!config.webhook.batch_mode);
        assert_eq!(config.webhook.notify_timeout, Duration::from_secs(30));
        assert_eq!(config.webhook.status_timeout, Duration::from_secs(10));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn unparsable_limits_are_rejected() {
        for name in [
            "MAX_ARCHIVE_SIZE_BYTES",
            "MAX_ENTRY_SIZE_BYTES",
            "MAX_CONCURRENT_EXTRACTIONS",
            "WEBHOOK_TIMEOUT_SECS",
        ] {
            let err = Config::from_lookup(lookup(&[("TOURS_BUCKET", "b"), (name, "1GB")]))
                .unwrap_err();
            assert!(err.to_string().contains(name), "{}", err);
        }

        let config = Config::from_lookup(lookup(&[
            ("TOURS_BUCKET", "b"),
            ("MAX_ARCHIVE_SIZE_BYTES", " 2048 "),
            ("WEBHOOK_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.max_archive_bytes, 2048);
        assert_eq!(config.webhook.notify_timeout, Duration::from_secs(5));
    }

    #[test]
    fn legacy_webhook_names_are_honoured() {
        let config = Config::from_lookup(lookup(&[
            ("TOURS_BUCKET", "b"),
            ("WORDPRESS_WEBHOOK_URL", "https://example.com/wp-json/h3tm/v1/tour-processed"),
            ("WORDPRESS_SECRET", "s3cret"),
            ("WEBHOOK_API_KEY", "key"),
            ("WEBHOOK_BATCH_MODE", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(
            config.webhook.url.as_deref(),
            Some("https://example.com/wp-json/h3tm/v1/tour-processed")
        );
        assert_eq!(config.webhook.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.webhook.api_key.as_deref(), Some("key"));
        assert!(config.webhook.batch_mode);
    }

    #[test]
    fn local_backend_requires_path() {
        let result = Config::from_lookup(lookup(&[
            ("TOURS_BUCKET", "b"),
            ("STORAGE_BACKEND", "local"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_http_webhook() {
        let result = Config::from_lookup(lookup(&[
            ("TOURS_BUCKET", "b"),
            ("WEBHOOK_URL", "ftp://example.com/hook"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn blank_values_are_unset() {
        let config = Config::from_lookup(lookup(&[
            ("TOURS_BUCKET", "b"),
            ("NOTIFICATION_TOPIC_ARN", "  "),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert!(config.notification_topic_arn.is_none());
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
