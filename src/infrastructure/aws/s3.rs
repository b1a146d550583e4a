use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client};
use tracing::{debug, error};

use crate::{errors::AppError, repositories::blob::BlobStore, settings::AppConfig};

/// S3-backed blob store. SDK errors are logged here with full detail; only
/// the generic storage taxonomy escapes.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub async fn new(config: &AppConfig) -> Self {
        let sdk_config = super::sdk_config(config).await;

        // Path-style addressing is required by LocalStack and MinIO.
        let client = if config.aws_endpoint_url.is_some() {
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(true)
                .build();
            Client::from_conf(s3_config)
        } else {
            Client::new(&sdk_config)
        };

        S3BlobStore {
            client,
            bucket: config.s3_bucket.clone(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key = %key, error = ?e, "S3 put failed");
                AppError::Storage("Object store write failed".to_string())
            })?;

        debug!(bucket = %self.bucket, key = %key, "stored blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                error!(bucket = %self.bucket, key = %key, error = ?service_error, "S3 get failed");
                return Err(AppError::Storage("Object store read failed".to_string()));
            }
        };

        let body = output.body.collect().await.map_err(|e| {
            error!(bucket = %self.bucket, key = %key, error = %e, "S3 body read failed");
            AppError::Storage("Object store read failed".to_string())
        })?;

        Ok(Some(body.to_vec()))
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key = %key, error = ?e, "S3 delete failed");
                AppError::Storage("Object store delete failed".to_string())
            })?;

        debug!(bucket = %self.bucket, key = %key, "deleted blob");
        Ok(())
    }

    async fn presign_download(&self, key: &str, ttl_seconds: u64) -> Result<String, AppError> {
        let presigning_config = PresigningConfig::expires_in(Duration::from_secs(ttl_seconds))
            .map_err(|e| {
                error!(error = %e, ttl_seconds, "invalid presigning configuration");
                AppError::Storage("Presigning configuration invalid".to_string())
            })?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key = %key, error = ?e, "presign failed");
                AppError::Storage("Presigned URL generation failed".to_string())
            })?;

        Ok(presigned.uri().to_string())
    }
}
