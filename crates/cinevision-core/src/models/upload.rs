use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{LanguageType, UploadStatus};
use crate::constants::{ALLOWED_VIDEO_CONTENT_TYPES, MAX_VIDEO_SIZE_BYTES, MULTIPART_PART_SIZE};

/// One multipart upload session tracked against a content language variant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VideoUpload {
    pub id: Uuid,
    pub content_id: Uuid,
    pub content_language_id: Uuid,
    /// Provider-side multipart session id; usable only while uploading.
    pub multipart_upload_id: String,
    pub storage_key: String,
    pub filename: String,
    pub content_type: String,
    pub total_size_bytes: i64,
    pub total_parts: i32,
    pub parts_completed: i32,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoUpload {
    pub fn progress_percent(&self) -> f32 {
        if self.total_parts == 0 {
            return 0.0;
        }
        (self.parts_completed as f32 / self.total_parts as f32) * 100.0
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for VideoUpload {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let status: String = row.try_get("status")?;
        Ok(VideoUpload {
            id: row.try_get("id")?,
            content_id: row.try_get("content_id")?,
            content_language_id: row.try_get("content_language_id")?,
            multipart_upload_id: row.try_get("multipart_upload_id")?,
            storage_key: row.try_get("storage_key")?,
            filename: row.try_get("filename")?,
            content_type: row.try_get("content_type")?,
            total_size_bytes: row.try_get("total_size_bytes")?,
            total_parts: row.try_get("total_parts")?,
            parts_completed: row.try_get("parts_completed")?,
            status: status
                .parse()
                .map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: e.into(),
                })?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Split a declared file size into the number of fixed-size parts.
pub fn part_count(total_size_bytes: u64) -> u32 {
    total_size_bytes.div_ceil(MULTIPART_PART_SIZE) as u32
}

/// Request to open a multipart upload for one language variant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct InitiateMultipartRequest {
    pub content_id: Uuid,
    /// ISO 639-1 code of the language variant this video belongs to.
    #[validate(length(min = 2, max = 8, message = "Language code must be 2-8 characters"))]
    pub language_code: String,
    #[serde(default = "default_language_type")]
    pub language_type: LanguageType,
    #[serde(default)]
    pub is_default: bool,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub filename: String,
    pub content_type: String,
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub total_size_bytes: u64,
}

fn default_language_type() -> LanguageType {
    LanguageType::Dubbed
}

impl InitiateMultipartRequest {
    /// Content-type and size gates applied before any provider call is made.
    pub fn check_video_limits(&self) -> Result<(), String> {
        if !ALLOWED_VIDEO_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(format!(
                "Content type '{}' is not allowed, expected one of: {}",
                self.content_type,
                ALLOWED_VIDEO_CONTENT_TYPES.join(", ")
            ));
        }
        if self.total_size_bytes > MAX_VIDEO_SIZE_BYTES {
            return Err(format!(
                "File size {} exceeds the maximum of {} bytes",
                self.total_size_bytes, MAX_VIDEO_SIZE_BYTES
            ));
        }
        Ok(())
    }
}

/// A presigned URL for one part, valid for a bounded window.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PresignedPartUrl {
    /// 1-based part number.
    pub part_number: i32,
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InitiateMultipartResponse {
    pub upload_id: Uuid,
    pub storage_key: String,
    pub part_size_bytes: u64,
    pub total_parts: u32,
    pub part_urls: Vec<PresignedPartUrl>,
    pub urls_expire_at: DateTime<Utc>,
}

/// ETag the storage provider returned for one uploaded part.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CompletedUploadPart {
    pub part_number: i32,
    pub etag: String,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CompleteMultipartRequest {
    #[validate(length(min = 1, message = "At least one part is required"))]
    pub parts: Vec<CompletedUploadPart>,
}

impl CompleteMultipartRequest {
    /// Parts must be exactly 1..=expected with no gaps or duplicates.
    /// Order does not matter; the list is sorted before the provider call.
    pub fn check_contiguous(&self, expected: i32) -> Result<(), String> {
        if self.parts.len() as i32 != expected {
            return Err(format!(
                "Expected {} parts, got {}",
                expected,
                self.parts.len()
            ));
        }
        let mut numbers: Vec<i32> = self.parts.iter().map(|p| p.part_number).collect();
        numbers.sort_unstable();
        for (idx, number) in numbers.iter().enumerate() {
            let want = idx as i32 + 1;
            if *number != want {
                return Err(format!("Missing or duplicate part number {}", want));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteMultipartResponse {
    pub upload_id: Uuid,
    pub content_language_id: Uuid,
    pub storage_key: String,
    pub status: UploadStatus,
    pub completed_at: DateTime<Utc>,
}

/// Client-reported progress for one finished part.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PartProgressRequest {
    #[validate(range(min = 1, message = "Part number must be at least 1"))]
    pub part_number: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadStatusResponse {
    pub upload_id: Uuid,
    pub status: UploadStatus,
    pub parts_completed: i32,
    pub total_parts: i32,
    pub progress_percent: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Snapshot broadcast to progress subscribers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadProgress {
    pub upload_id: Uuid,
    pub status: UploadStatus,
    pub parts_completed: i32,
    pub total_parts: i32,
    pub progress_percent: f32,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content_type: &str, size: u64) -> InitiateMultipartRequest {
        InitiateMultipartRequest {
            content_id: Uuid::new_v4(),
            language_code: "en".to_string(),
            language_type: LanguageType::Dubbed,
            is_default: false,
            filename: "movie.mp4".to_string(),
            content_type: content_type.to_string(),
            total_size_bytes: size,
        }
    }

    #[test]
    fn test_part_count_rounds_up() {
        assert_eq!(part_count(1), 1);
        assert_eq!(part_count(MULTIPART_PART_SIZE), 1);
        assert_eq!(part_count(MULTIPART_PART_SIZE + 1), 2);
        assert_eq!(part_count(MULTIPART_PART_SIZE * 3), 3);
    }

    #[test]
    fn test_video_limits() {
        assert!(request("video/mp4", 1024).check_video_limits().is_ok());
        assert!(request("video/x-matroska", 1024)
            .check_video_limits()
            .is_ok());
        assert!(request("image/png", 1024).check_video_limits().is_err());
        assert!(request("video/mp4", MAX_VIDEO_SIZE_BYTES + 1)
            .check_video_limits()
            .is_err());
    }

    #[test]
    fn test_contiguous_parts_accept_any_order() {
        let req = CompleteMultipartRequest {
            parts: vec![
                CompletedUploadPart {
                    part_number: 3,
                    etag: "c".to_string(),
                },
                CompletedUploadPart {
                    part_number: 1,
                    etag: "a".to_string(),
                },
                CompletedUploadPart {
                    part_number: 2,
                    etag: "b".to_string(),
                },
            ],
        };
        assert!(req.check_contiguous(3).is_ok());
    }

    #[test]
    fn test_contiguous_parts_reject_gaps_and_duplicates() {
        let gap = CompleteMultipartRequest {
            parts: vec![
                CompletedUploadPart {
                    part_number: 1,
                    etag: "a".to_string(),
                },
                CompletedUploadPart {
                    part_number: 3,
                    etag: "c".to_string(),
                },
            ],
        };
        assert!(gap.check_contiguous(2).is_err());

        let dup = CompleteMultipartRequest {
            parts: vec![
                CompletedUploadPart {
                    part_number: 1,
                    etag: "a".to_string(),
                },
                CompletedUploadPart {
                    part_number: 1,
                    etag: "a2".to_string(),
                },
            ],
        };
        assert!(dup.check_contiguous(2).is_err());

        let short = CompleteMultipartRequest {
            parts: vec![CompletedUploadPart {
                part_number: 1,
                etag: "a".to_string(),
            }],
        };
        assert!(short.check_contiguous(2).is_err());
    }
}
