use crate::traits::{ObjectMetadata, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::collections::HashMap;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region; falls back to the SDK's default provider chain
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(region: Option<String>, endpoint_url: Option<String>) -> StorageResult<Self> {
        let region_provider = RegionProviderChain::first_try(region.map(aws_config::Region::new))
            .or_default_provider();

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            // Path-style addressing is required by MinIO and most S3-compatible providers
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config)
                .force_path_style(true);
            if let Some(provider) = config.credentials_provider() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        Ok(S3Storage { client })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let start = std::time::Instant::now();

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if let SdkError::ServiceError(service_err) = &e {
                    if let GetObjectError::NoSuchKey(_) = service_err.err() {
                        return StorageError::NotFound(format!("s3://{}/{}", bucket, key));
                    }
                }
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(e.to_string())
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        let bytes = data.into_bytes().to_vec();

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let body = ByteStream::from(Bytes::from(data));
        let start = std::time::Instant::now();
        let user_metadata: HashMap<String, String> = metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .set_metadata(Some(user_metadata))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            content_type = %content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
