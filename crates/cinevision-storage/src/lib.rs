//! CineVision storage library
//!
//! Storage abstraction for video objects: multipart upload sessions with
//! presigned part URLs, plus presigned playback URLs. The only backend is
//! S3 (or any S3-compatible provider via a custom endpoint).
//!
//! # Storage key format
//!
//! Video objects live under `raw/{content_id}/{language_code}/{timestamp}-{filename}`.
//! Filenames are sanitized before they enter a key; keys never contain `..`
//! or a leading `/`. Key generation is centralized in the `keys` module.

pub mod keys;
pub mod s3;
pub mod traits;

pub use keys::video_object_key;
pub use s3::S3Storage;
pub use traits::{PartUrl, Storage, StorageError, StorageResult, UploadedPart};
