use crate::traits::{PartUrl, Storage, StorageError, StorageResult, UploadedPart};
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use std::time::Duration;

/// S3 storage implementation
///
/// Works against AWS S3 or any S3-compatible provider (MinIO, Wasabi,
/// DigitalOcean Spaces) via a custom endpoint.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Build a client from the ambient AWS environment plus explicit
    /// bucket/region settings. Custom endpoints force path-style addressing
    /// since most S3-compatible providers require it.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut loader = aws_config::from_env().region(aws_config::Region::new(region));
        if let Some(ref endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&config);
        if endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        Ok(S3Storage { client, bucket })
    }

    fn presign_config(expires_in: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn create_multipart_upload(
        &self,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(storage_key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "Failed to initiate multipart upload"
                );
                StorageError::InitiateFailed(e.to_string())
            })?;

        let upload_id = response.upload_id().ok_or_else(|| {
            StorageError::InitiateFailed(format!("missing upload id for key {}", storage_key))
        })?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %storage_key,
            upload_id = %upload_id,
            "Multipart upload initiated"
        );

        Ok(upload_id.to_string())
    }

    async fn presign_part_urls(
        &self,
        storage_key: &str,
        upload_id: &str,
        total_parts: i32,
        expires_in: Duration,
    ) -> StorageResult<Vec<PartUrl>> {
        let mut urls = Vec::with_capacity(total_parts as usize);
        for part_number in 1..=total_parts {
            let presigned = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(storage_key)
                .upload_id(upload_id)
                .part_number(part_number)
                .presigned(Self::presign_config(expires_in)?)
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %storage_key,
                        part_number,
                        "Failed to presign part URL"
                    );
                    StorageError::PresignFailed(e.to_string())
                })?;

            urls.push(PartUrl {
                part_number,
                url: presigned.uri().to_string(),
            });
        }

        Ok(urls)
    }

    async fn complete_multipart_upload(
        &self,
        storage_key: &str,
        upload_id: &str,
        mut parts: Vec<UploadedPart>,
    ) -> StorageResult<()> {
        parts.sort_by_key(|p| p.part_number);
        let completed: Vec<CompletedPart> = parts
            .into_iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(p.etag)
                    .build()
            })
            .collect();

        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(storage_key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    upload_id = %upload_id,
                    "Failed to complete multipart upload"
                );
                StorageError::CompleteFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            upload_id = %upload_id,
            "Multipart upload completed"
        );

        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        storage_key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(storage_key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    upload_id = %upload_id,
                    "Failed to abort multipart upload"
                );
                StorageError::AbortFailed(e.to_string())
            })?;

        tracing::warn!(
            bucket = %self.bucket,
            key = %storage_key,
            upload_id = %upload_id,
            "Multipart upload aborted"
        );

        Ok(())
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .presigned(Self::presign_config(expires_in)?)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::BackendError(service_err.to_string()))
                }
            }
        }
    }
}
