//! Upload progress hub
//!
//! Live part-by-part progress for admin dashboards. Updates are fanned out
//! over a broadcast channel to websocket subscribers; the latest snapshot per
//! upload is kept so a late subscriber starts from current state instead of
//! an empty screen.

use chrono::Utc;
use cinevision_core::models::{UploadProgress, UploadStatus, VideoUpload};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const BROADCAST_CAPACITY: usize = 256;

struct Inner {
    snapshots: RwLock<HashMap<Uuid, UploadProgress>>,
    tx: broadcast::Sender<UploadProgress>,
}

#[derive(Clone)]
pub struct ProgressHub {
    inner: Arc<Inner>,
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                snapshots: RwLock::new(HashMap::new()),
                tx,
            }),
        }
    }

    /// Publish the current state of an upload. Terminal uploads are dropped
    /// from the snapshot map after the final frame goes out.
    pub async fn publish(&self, upload: &VideoUpload) {
        let progress = UploadProgress {
            upload_id: upload.id,
            status: upload.status,
            parts_completed: upload.parts_completed,
            total_parts: upload.total_parts,
            progress_percent: upload.progress_percent(),
            updated_at: Utc::now(),
        };

        {
            let mut snapshots = self.inner.snapshots.write().await;
            if upload.status == UploadStatus::Uploading {
                snapshots.insert(upload.id, progress.clone());
            } else {
                snapshots.remove(&upload.id);
            }
        }

        // Send fails only when nobody is subscribed, which is fine.
        self.inner.tx.send(progress).ok();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UploadProgress> {
        self.inner.tx.subscribe()
    }

    /// Current state of all in-flight uploads.
    pub async fn snapshot(&self) -> Vec<UploadProgress> {
        let snapshots = self.inner.snapshots.read().await;
        let mut all: Vec<UploadProgress> = snapshots.values().cloned().collect();
        all.sort_by_key(|p| p.upload_id);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn upload(status: UploadStatus, parts_completed: i32) -> VideoUpload {
        let now = Utc::now();
        VideoUpload {
            id: Uuid::new_v4(),
            content_id: Uuid::new_v4(),
            content_language_id: Uuid::new_v4(),
            multipart_upload_id: "mp-1".to_string(),
            storage_key: "raw/x/en/1-movie.mp4".to_string(),
            filename: "movie.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            total_size_bytes: 100,
            total_parts: 4,
            parts_completed,
            status,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_progress() {
        let hub = ProgressHub::new();
        let mut rx = hub.subscribe();

        let u = upload(UploadStatus::Uploading, 2);
        hub.publish(&u).await;

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.upload_id, u.id);
        assert_eq!(frame.parts_completed, 2);
        assert_eq!(frame.progress_percent, 50.0);
    }

    #[tokio::test]
    async fn test_snapshot_tracks_only_inflight_uploads() {
        let hub = ProgressHub::new();

        let active = upload(UploadStatus::Uploading, 1);
        hub.publish(&active).await;
        assert_eq!(hub.snapshot().await.len(), 1);

        let mut finished = active.clone();
        finished.status = UploadStatus::Completed;
        finished.parts_completed = 4;
        hub.publish(&finished).await;
        assert!(hub.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_panic() {
        let hub = ProgressHub::new();
        hub.publish(&upload(UploadStatus::Uploading, 1)).await;
    }
}
