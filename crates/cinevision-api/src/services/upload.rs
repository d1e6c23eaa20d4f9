use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cinevision_core::constants::{MULTIPART_PART_SIZE, PART_URL_EXPIRY_SECS};
use cinevision_core::models::{
    part_count, CompleteMultipartRequest, CompleteMultipartResponse, InitiateMultipartRequest,
    InitiateMultipartResponse, PresignedPartUrl, UploadStatus, UploadStatusResponse, VideoUpload,
};
use cinevision_core::AppError;
use cinevision_db::{ContentLanguageRepository, ContentRepository, VideoUploadRepository};
use cinevision_storage::{video_object_key, Storage, UploadedPart};
use uuid::Uuid;

use crate::progress::ProgressHub;

/// Drives multipart upload sessions against the storage backend and keeps
/// the tracking rows and the progress hub in sync.
#[derive(Clone)]
pub struct UploadService {
    uploads: VideoUploadRepository,
    content: ContentRepository,
    languages: ContentLanguageRepository,
    storage: Arc<dyn Storage>,
    progress: ProgressHub,
}

impl UploadService {
    pub fn new(
        uploads: VideoUploadRepository,
        content: ContentRepository,
        languages: ContentLanguageRepository,
        storage: Arc<dyn Storage>,
        progress: ProgressHub,
    ) -> Self {
        Self {
            uploads,
            content,
            languages,
            storage,
            progress,
        }
    }

    /// Open a multipart session: upsert the language variant, open the
    /// provider session, presign one URL per part, then write the tracking
    /// row. If the row insert fails the provider session is aborted so no
    /// orphan survives.
    pub async fn initiate(
        &self,
        request: InitiateMultipartRequest,
    ) -> Result<InitiateMultipartResponse, AppError> {
        request
            .check_video_limits()
            .map_err(AppError::InvalidInput)?;

        let content = self
            .content
            .find_summary(request.content_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Content {}", request.content_id)))?;

        let language = self
            .languages
            .upsert(
                content.id,
                &request.language_code,
                request.language_type,
                request.is_default,
            )
            .await?;

        let now = Utc::now();
        let storage_key =
            video_object_key(content.id, &request.language_code, now, &request.filename);
        let total_parts = part_count(request.total_size_bytes) as i32;

        let multipart_upload_id = self
            .storage
            .create_multipart_upload(&storage_key, &request.content_type)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let expiry = Duration::from_secs(PART_URL_EXPIRY_SECS);
        let part_urls = match self
            .storage
            .presign_part_urls(&storage_key, &multipart_upload_id, total_parts, expiry)
            .await
        {
            Ok(urls) => urls,
            Err(e) => {
                self.abort_quietly(&storage_key, &multipart_upload_id).await;
                return Err(AppError::Storage(e.to_string()));
            }
        };

        let upload = match self
            .uploads
            .create(
                content.id,
                language.id,
                &multipart_upload_id,
                &storage_key,
                &request.filename,
                &request.content_type,
                request.total_size_bytes as i64,
                total_parts,
            )
            .await
        {
            Ok(upload) => upload,
            Err(e) => {
                self.abort_quietly(&storage_key, &multipart_upload_id).await;
                return Err(e);
            }
        };

        self.progress.publish(&upload).await;

        tracing::info!(
            upload_id = %upload.id,
            content_id = %content.id,
            language = %request.language_code,
            total_parts,
            "Multipart upload initiated"
        );

        Ok(InitiateMultipartResponse {
            upload_id: upload.id,
            storage_key,
            part_size_bytes: MULTIPART_PART_SIZE,
            total_parts: total_parts as u32,
            part_urls: part_urls
                .into_iter()
                .map(|u| PresignedPartUrl {
                    part_number: u.part_number,
                    url: u.url,
                })
                .collect(),
            urls_expire_at: now + chrono::Duration::seconds(PART_URL_EXPIRY_SECS as i64),
        })
    }

    /// Record one finished part and fan the new state out to progress
    /// subscribers. Parts may finish in any order; repeats count once.
    pub async fn record_part(
        &self,
        upload_id: Uuid,
        part_number: i32,
    ) -> Result<UploadStatusResponse, AppError> {
        let upload = self.require_upload(upload_id).await?;
        if part_number > upload.total_parts {
            return Err(AppError::InvalidInput(format!(
                "Part number {} exceeds total parts {}",
                part_number, upload.total_parts
            )));
        }

        let updated = self
            .uploads
            .record_part_progress(upload_id, part_number)
            .await?
            .ok_or_else(|| AppError::IllegalStateTransition {
                entity: "video_upload",
                id: upload_id.to_string(),
                from: upload.status.to_string(),
                to: UploadStatus::Uploading.to_string(),
            })?;

        self.progress.publish(&updated).await;
        Ok(Self::status_response(&updated))
    }

    /// Stitch the parts and close the session. The part list must cover
    /// exactly `1..=total_parts`.
    pub async fn complete(
        &self,
        upload_id: Uuid,
        request: CompleteMultipartRequest,
    ) -> Result<CompleteMultipartResponse, AppError> {
        let upload = self.require_upload(upload_id).await?;

        if upload.status == UploadStatus::Completed {
            // Repeat of a finished completion call.
            return Ok(CompleteMultipartResponse {
                upload_id: upload.id,
                content_language_id: upload.content_language_id,
                storage_key: upload.storage_key.clone(),
                status: upload.status,
                completed_at: upload.updated_at,
            });
        }
        if !upload.status.session_open() {
            return Err(AppError::IllegalStateTransition {
                entity: "video_upload",
                id: upload.id.to_string(),
                from: upload.status.to_string(),
                to: UploadStatus::Completed.to_string(),
            });
        }

        request
            .check_contiguous(upload.total_parts)
            .map_err(|reason| AppError::IncompleteParts {
                expected: upload.total_parts,
                reason,
            })?;

        let parts: Vec<UploadedPart> = request
            .parts
            .iter()
            .map(|p| UploadedPart {
                part_number: p.part_number,
                etag: p.etag.clone(),
            })
            .collect();

        if let Err(e) = self
            .storage
            .complete_multipart_upload(&upload.storage_key, &upload.multipart_upload_id, parts)
            .await
        {
            let failed = self
                .uploads
                .mark_closed(upload.id, UploadStatus::Error, Some(&e.to_string()))
                .await?;
            if let Some(failed) = failed {
                self.progress.publish(&failed).await;
            }
            return Err(AppError::Storage(e.to_string()));
        }

        let completed = self
            .uploads
            .mark_completed(upload.id)
            .await?
            .ok_or_else(|| AppError::IllegalStateTransition {
                entity: "video_upload",
                id: upload.id.to_string(),
                from: upload.status.to_string(),
                to: UploadStatus::Completed.to_string(),
            })?;

        // The variant now points at a playable object.
        self.languages
            .set_storage_key(completed.content_language_id, &completed.storage_key)
            .await?;

        self.progress.publish(&completed).await;

        tracing::info!(
            upload_id = %completed.id,
            storage_key = %completed.storage_key,
            "Multipart upload completed"
        );

        Ok(CompleteMultipartResponse {
            upload_id: completed.id,
            content_language_id: completed.content_language_id,
            storage_key: completed.storage_key.clone(),
            status: completed.status,
            completed_at: completed.updated_at,
        })
    }

    /// Abort the session and discard uploaded parts.
    pub async fn cancel(&self, upload_id: Uuid) -> Result<UploadStatusResponse, AppError> {
        let upload = self.require_upload(upload_id).await?;
        if !upload.status.session_open() {
            return Err(AppError::IllegalStateTransition {
                entity: "video_upload",
                id: upload.id.to_string(),
                from: upload.status.to_string(),
                to: UploadStatus::Cancelled.to_string(),
            });
        }

        self.storage
            .abort_multipart_upload(&upload.storage_key, &upload.multipart_upload_id)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let cancelled = self
            .uploads
            .mark_closed(upload.id, UploadStatus::Cancelled, None)
            .await?
            .ok_or_else(|| AppError::IllegalStateTransition {
                entity: "video_upload",
                id: upload.id.to_string(),
                from: upload.status.to_string(),
                to: UploadStatus::Cancelled.to_string(),
            })?;

        self.progress.publish(&cancelled).await;
        Ok(Self::status_response(&cancelled))
    }

    pub async fn status(&self, upload_id: Uuid) -> Result<UploadStatusResponse, AppError> {
        let upload = self.require_upload(upload_id).await?;
        Ok(Self::status_response(&upload))
    }

    async fn require_upload(&self, upload_id: Uuid) -> Result<VideoUpload, AppError> {
        self.uploads
            .find_by_id(upload_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload {}", upload_id)))
    }

    async fn abort_quietly(&self, storage_key: &str, multipart_upload_id: &str) {
        if let Err(e) = self
            .storage
            .abort_multipart_upload(storage_key, multipart_upload_id)
            .await
        {
            tracing::warn!(
                key = %storage_key,
                error = %e,
                "Failed to abort multipart session during cleanup"
            );
        }
    }

    fn status_response(upload: &VideoUpload) -> UploadStatusResponse {
        UploadStatusResponse {
            upload_id: upload.id,
            status: upload.status,
            parts_completed: upload.parts_completed,
            total_parts: upload.total_parts,
            progress_percent: upload.progress_percent(),
            error_message: upload.error_message.clone(),
        }
    }
}
