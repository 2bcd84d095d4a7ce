//! S3 adapter for the `ObjectStorage` port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;

use crate::config::StorageSettings;
use crate::domain::ObjectStorage;
use crate::shared::error::AppError;

/// Region that rejects an explicit location constraint on bucket creation
const DEFAULT_REGION: &str = "us-east-1";

fn storage_error(context: &str, err: impl std::error::Error) -> AppError {
    AppError::Storage(format!("{}: {}", context, DisplayErrorContext(err)))
}

/// S3 client bound to one bucket.
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: String,
    bucket_ready: AtomicBool,
}

impl S3Storage {
    pub fn new(settings: &StorageSettings) -> Self {
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "chat-backend-settings",
        );

        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(settings.endpoint_url())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(config),
            bucket: settings.bucket.clone(),
            region: settings.region.clone(),
            bucket_ready: AtomicBool::new(false),
        }
    }

    async fn bucket_exists(&self) -> Result<bool, AppError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => match err.as_service_error() {
                Some(service) if service.is_not_found() => Ok(false),
                _ => Err(storage_error("head bucket", err)),
            },
        }
    }

    async fn create_bucket(&self) -> Result<(), AppError> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            // Lost a creation race with another instance.
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists())
                    .unwrap_or(false) =>
            {
                Ok(())
            }
            Err(err) => Err(storage_error("create bucket", err)),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket(&self) -> Result<(), AppError> {
        if self.bucket_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        if !self.bucket_exists().await? {
            self.create_bucket().await?;
            tracing::info!(bucket = %self.bucket, "Bucket created");
        }

        self.bucket_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| storage_error("put object", e))?;

        Ok(())
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, AppError> {
        let config =
            PresigningConfig::expires_in(expires_in).map_err(|e| storage_error("presign", e))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| storage_error("presign", e))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_settings;

    #[tokio::test]
    async fn test_presigned_url_is_path_style_and_bounded() {
        let settings = test_settings();
        let storage = S3Storage::new(&settings.storage);

        let url = storage
            .presigned_get_url("2024/05/01/abc.png", Duration::from_secs(600))
            .await
            .unwrap();

        let expected_prefix = format!(
            "{}/{}/2024/05/01/abc.png",
            settings.storage.endpoint_url(),
            settings.storage.bucket
        );
        assert!(url.starts_with(&expected_prefix), "{}", url);
        assert!(url.contains("X-Amz-Expires=600"));
    }

    #[test]
    fn test_bucket_name_comes_from_settings() {
        let settings = test_settings();
        let storage = S3Storage::new(&settings.storage);
        assert_eq!(storage.bucket(), settings.storage.bucket);
    }
}
