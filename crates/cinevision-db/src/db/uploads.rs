use cinevision_core::models::{UploadStatus, VideoUpload};
use cinevision_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::transaction::TransactionGuard;

/// Repository for multipart upload sessions.
#[derive(Clone)]
pub struct VideoUploadRepository {
    pool: PgPool,
}

impl VideoUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        content_id: Uuid,
        content_language_id: Uuid,
        multipart_upload_id: &str,
        storage_key: &str,
        filename: &str,
        content_type: &str,
        total_size_bytes: i64,
        total_parts: i32,
    ) -> Result<VideoUpload, AppError> {
        let upload = sqlx::query_as::<_, VideoUpload>(
            r#"
            INSERT INTO video_uploads (
                id, content_id, content_language_id, multipart_upload_id,
                storage_key, filename, content_type,
                total_size_bytes, total_parts, parts_completed, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, 'uploading')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content_id)
        .bind(content_language_id)
        .bind(multipart_upload_id)
        .bind(storage_key)
        .bind(filename)
        .bind(content_type)
        .bind(total_size_bytes)
        .bind(total_parts)
        .fetch_one(&self.pool)
        .await?;

        Ok(upload)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<VideoUpload>, AppError> {
        let upload = sqlx::query_as::<_, VideoUpload>("SELECT * FROM video_uploads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(upload)
    }

    /// Record one finished part. Each part counts once regardless of the
    /// order parts finish in or how often the client reports them, so the
    /// counter is the number of distinct completed parts.
    pub async fn record_part_progress(
        &self,
        id: Uuid,
        part_number: i32,
    ) -> Result<Option<VideoUpload>, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO video_upload_parts (upload_id, part_number)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(part_number)
        .execute(&mut **tx)
        .await?;

        let upload = sqlx::query_as::<_, VideoUpload>(
            r#"
            UPDATE video_uploads
            SET parts_completed = (
                    SELECT COUNT(*)::INTEGER FROM video_upload_parts
                    WHERE upload_id = $1
                ),
                updated_at = NOW()
            WHERE id = $1 AND status = 'uploading'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        match upload {
            Some(upload) => {
                tx.commit().await?;
                Ok(Some(upload))
            }
            None => {
                // Session already closed; drop the part row with it.
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    /// CAS `uploading -> completed`, marking all parts done.
    pub async fn mark_completed(&self, id: Uuid) -> Result<Option<VideoUpload>, AppError> {
        let upload = sqlx::query_as::<_, VideoUpload>(
            r#"
            UPDATE video_uploads
            SET status = 'completed', parts_completed = total_parts, updated_at = NOW()
            WHERE id = $1 AND status = 'uploading'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(upload)
    }

    /// CAS `uploading -> error | cancelled`.
    pub async fn mark_closed(
        &self,
        id: Uuid,
        to: UploadStatus,
        error_message: Option<&str>,
    ) -> Result<Option<VideoUpload>, AppError> {
        if !UploadStatus::Uploading.can_transition(to) || to == UploadStatus::Completed {
            return Err(AppError::IllegalStateTransition {
                entity: "video_upload",
                id: id.to_string(),
                from: UploadStatus::Uploading.to_string(),
                to: to.to_string(),
            });
        }

        let upload = sqlx::query_as::<_, VideoUpload>(
            r#"
            UPDATE video_uploads
            SET status = $2, error_message = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'uploading'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .bind(error_message)
        .fetch_optional(&self.pool)
        .await?;

        Ok(upload)
    }

    /// Sessions still marked uploading past the TTL; the sweeper aborts
    /// these against the storage provider before closing them out.
    pub async fn list_stale_uploading(&self, ttl_secs: i64) -> Result<Vec<VideoUpload>, AppError> {
        let uploads = sqlx::query_as::<_, VideoUpload>(
            r#"
            SELECT * FROM video_uploads
            WHERE status = 'uploading' AND created_at < NOW() - ($1 * INTERVAL '1 second')
            ORDER BY created_at
            "#,
        )
        .bind(ttl_secs)
        .fetch_all(&self.pool)
        .await?;

        Ok(uploads)
    }
}
