//! Shared key generation for video objects.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Build the object key for an uploaded video:
/// `raw/{content_id}/{language_code}/{timestamp}-{sanitized_filename}`.
pub fn video_object_key(
    content_id: Uuid,
    language_code: &str,
    uploaded_at: DateTime<Utc>,
    filename: &str,
) -> String {
    format!(
        "raw/{}/{}/{}-{}",
        content_id,
        language_code,
        uploaded_at.timestamp(),
        sanitize_filename(filename)
    )
}

/// Strip path separators and anything outside `[A-Za-z0-9._-]` so a
/// client-supplied filename can never escape its key prefix.
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let content_id = Uuid::nil();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let key = video_object_key(content_id, "en", at, "My Movie.mp4");
        assert_eq!(
            key,
            format!("raw/{}/en/1700000000-My_Movie.mp4", content_id)
        );
    }

    #[test]
    fn test_sanitize_blocks_traversal() {
        let at = Utc::now();
        let key = video_object_key(Uuid::nil(), "en", at, "../../etc/passwd");
        assert!(!key.contains(".."));
        assert!(!key.contains("/etc/"));
    }

    #[test]
    fn test_sanitize_empty_filename_falls_back() {
        let at = Utc::now();
        let key = video_object_key(Uuid::nil(), "en", at, "...");
        assert!(key.ends_with("-file"));
    }
}
