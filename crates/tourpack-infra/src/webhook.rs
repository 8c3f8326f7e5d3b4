//! Webhook sink and tour-status round trip.

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tourpack_core::WebhookConfig;

use crate::signature::{canonical_json, signature_header};

const USER_AGENT: &str = "Tourpack-Webhook/1.0";
const NOTIFY_PATH_SUFFIX: &str = "/tour-processed";

/// Characters escaped in the `{tour}` path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Response of a delivered webhook
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status_code: u16,
    pub body: String,
}

/// HTTP client for the external webhook endpoint
#[derive(Clone)]
pub struct WebhookClient {
    http_client: Client,
    url: String,
    api_key: Option<String>,
    secret: Option<String>,
    notify_timeout: Duration,
    status_timeout: Duration,
}

impl std::fmt::Debug for WebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookClient")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("notify_timeout", &self.notify_timeout)
            .field("status_timeout", &self.status_timeout)
            .finish()
    }
}

impl WebhookClient {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        secret: Option<String>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create HTTP client for webhooks")?;
        let defaults = WebhookConfig::default();

        Ok(Self {
            http_client,
            url: url.into(),
            api_key,
            secret,
            notify_timeout: defaults.notify_timeout,
            status_timeout: defaults.status_timeout,
        })
    }

    /// Client for the configured endpoint, or `None` when no URL is set.
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>> {
        match &config.url {
            Some(url) => Ok(Some(
                Self::new(url.clone(), config.api_key.clone(), config.secret.clone())?
                    .with_timeouts(config.notify_timeout, config.status_timeout),
            )),
            None => Ok(None),
        }
    }

    /// Per-request timeouts for notification POSTs and status calls
    pub fn with_timeouts(mut self, notify: Duration, status: Duration) -> Self {
        self.notify_timeout = notify;
        self.status_timeout = status;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Notification URL with a trailing `/tour-processed` removed
    pub fn base_url(&self) -> &str {
        let trimmed = self.url.trim_end_matches('/');
        trimmed.strip_suffix(NOTIFY_PATH_SUFFIX).unwrap_or(trimmed)
    }

    pub fn status_url(&self, tour_name: &str) -> String {
        format!(
            "{}/tour-status/{}",
            self.base_url(),
            utf8_percent_encode(tour_name, PATH_SEGMENT)
        )
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    /// POST `payload` as canonical JSON, signed when a secret is configured.
    ///
    /// Only a 200 counts as delivered; any other status is an error.
    #[tracing::instrument(skip(self, payload), fields(url = %self.url))]
    pub async fn send(&self, payload: &Value) -> Result<WebhookResponse> {
        let body = canonical_json(payload);
        let start = std::time::Instant::now();

        let mut request = self
            .http_client
            .post(&self.url)
            .timeout(self.notify_timeout)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT);
        request = self.with_api_key(request);

        if let Some(secret) = &self.secret {
            request = request.header("X-Signature", signature_header(&body, secret)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .context("Failed to send webhook request")?;

        let status = response.status();
        let status_code = status.as_u16();
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("Failed to read response body"));

        if status == StatusCode::OK {
            tracing::info!(
                status_code,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Webhook delivered"
            );
            Ok(WebhookResponse {
                status_code,
                body: response_body,
            })
        } else {
            Err(anyhow::anyhow!(
                "Webhook returned non-200 status: {} - {}",
                status_code,
                response_body
            ))
        }
    }

    /// Fetch the status record of a tour. Any status other than 200 yields `None`.
    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, tour_name: &str) -> Result<Option<Value>> {
        let request = self
            .http_client
            .get(self.status_url(tour_name))
            .timeout(self.status_timeout);

        let response = self
            .with_api_key(request)
            .send()
            .await
            .context("Failed to fetch tour status")?;

        if response.status() != StatusCode::OK {
            tracing::warn!(
                status_code = response.status().as_u16(),
                tour_name = %tour_name,
                "Tour status lookup returned non-200"
            );
            return Ok(None);
        }

        let status = response
            .json::<Value>()
            .await
            .context("Tour status response is not JSON")?;
        Ok(Some(status))
    }

    /// Replace the status record of a tour. True on 200 or 201.
    #[tracing::instrument(skip(self, status))]
    pub async fn update_status(&self, tour_name: &str, status: &Value) -> Result<bool> {
        let request = self
            .http_client
            .put(self.status_url(tour_name))
            .timeout(self.status_timeout)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT);

        let response = self
            .with_api_key(request)
            .body(canonical_json(status))
            .send()
            .await
            .context("Failed to update tour status")?;

        let updated = matches!(response.status(), StatusCode::OK | StatusCode::CREATED);
        if !updated {
            tracing::warn!(
                status_code = response.status().as_u16(),
                tour_name = %tour_name,
                "Tour status update rejected"
            );
        }
        Ok(updated)
    }
}
