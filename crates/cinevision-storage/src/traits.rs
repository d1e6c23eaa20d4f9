//! Storage abstraction trait
//!
//! The upload pipeline drives the backend through this trait so handlers and
//! services can be tested against an in-memory fake.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Multipart initiation failed: {0}")]
    InitiateFailed(String),

    #[error("Multipart completion failed: {0}")]
    CompleteFailed(String),

    #[error("Multipart abort failed: {0}")]
    AbortFailed(String),

    #[error("Presigning failed: {0}")]
    PresignFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A presigned URL for uploading one part.
#[derive(Debug, Clone)]
pub struct PartUrl {
    /// 1-based part number.
    pub part_number: i32,
    pub url: String,
}

/// ETag evidence that one part landed, as reported by the client.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Storage abstraction trait
///
/// Clients upload parts directly to the backend via presigned URLs; the
/// server only opens, completes, or aborts the session.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Open a multipart upload session and return the backend's upload id.
    async fn create_multipart_upload(
        &self,
        storage_key: &str,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Presign an UploadPart URL for each part number in `1..=total_parts`.
    async fn presign_part_urls(
        &self,
        storage_key: &str,
        upload_id: &str,
        total_parts: i32,
        expires_in: Duration,
    ) -> StorageResult<Vec<PartUrl>>;

    /// Stitch the uploaded parts into the final object. Parts must be sorted
    /// by part number before the call.
    async fn complete_multipart_upload(
        &self,
        storage_key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> StorageResult<()>;

    /// Abort a session, discarding any uploaded parts.
    async fn abort_multipart_upload(&self, storage_key: &str, upload_id: &str)
        -> StorageResult<()>;

    /// Presigned GET URL for playback/download.
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Check if an object exists.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}
