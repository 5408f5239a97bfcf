//! `ObjectStorage` backed by Amazon S3 (or an S3-compatible endpoint).

use super::object_storage::{ObjectStorage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::{
    Attribute, Attributes, ClientOptions, Error as ObjectStoreError, ObjectStore, PutOptions,
    PutPayload, RetryConfig,
    aws::{AmazonS3, AmazonS3Builder},
    path::Path,
};
use std::time::{Duration, Instant};

/// Connection settings for [`S3Storage`]. Credentials are read from the
/// standard `AWS_*` environment variables by the client itself.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, Spaces, ...).
    pub endpoint: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: usize,
}

#[derive(Clone, Debug)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Storage {
    pub fn new(settings: S3Settings) -> StorageResult<Self> {
        let client_options = ClientOptions::new()
            .with_connect_timeout(settings.connect_timeout)
            .with_timeout(settings.request_timeout);
        let retry = RetryConfig {
            max_retries: settings.max_retries,
            ..Default::default()
        };

        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone())
            .with_client_options(client_options)
            .with_retry(retry);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Unavailable(format!("invalid S3 configuration: {}", e)))?;

        Ok(Self {
            store,
            bucket: settings.bucket,
            region: settings.region,
            endpoint: settings.endpoint,
        })
    }

    fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket, &self.region, self.endpoint.as_deref(), key)
    }
}

/// Public URL of `key`.
///
/// AWS uses the virtual-hosted form; custom endpoints use path style.
pub fn object_url(bucket: &str, region: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

/// Connectivity and credential problems are `Unavailable`; anything the
/// service answered with a definite rejection is a failed write.
fn classify(err: ObjectStoreError) -> StorageError {
    match &err {
        ObjectStoreError::Generic { .. }
        | ObjectStoreError::PermissionDenied { .. }
        | ObjectStoreError::Unauthenticated { .. } => StorageError::Unavailable(err.to_string()),
        _ => StorageError::WriteFailed(err.to_string()),
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> StorageResult<String> {
        let start = Instant::now();
        let size = content.len();
        let location = Path::from(key);

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(content), opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                classify(e)
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.object_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = Instant::now();
        let location = Path::from(key);

        match self.store.delete(&location).await {
            Ok(()) => {}
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "S3 object already absent");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::Unavailable(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );
        Ok(())
    }

    /// Lists at most one entry of the bucket.
    async fn head_bucket(&self) -> StorageResult<()> {
        let mut listing = self.store.list(None);
        match listing.next().await {
            None | Some(Ok(_)) => Ok(()),
            Some(Err(e)) => Err(StorageError::Unavailable(e.to_string())),
        }
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
