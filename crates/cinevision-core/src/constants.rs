//! Application-wide constants

/// API version prefix for all routes
pub const API_PREFIX: &str = "/api/v0";

/// Size of one multipart upload part (S3 minimum is 5 MiB; the admin uploader
/// splits at 50 MiB, matching the part size the frontend was built against)
pub const MULTIPART_PART_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum accepted video file size (10 GiB)
pub const MAX_VIDEO_SIZE_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Content types accepted for video ingestion
pub const ALLOWED_VIDEO_CONTENT_TYPES: &[&str] =
    &["video/mp4", "video/x-matroska", "video/quicktime"];

/// Expiry for presigned part-upload URLs, in seconds
pub const PART_URL_EXPIRY_SECS: u64 = 3600;

/// Number of random bytes in an access token (hex-encoded on mint)
pub const ACCESS_TOKEN_BYTES: usize = 32;
