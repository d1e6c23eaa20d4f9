//! Background expiry sweep
//!
//! One periodic worker closes out everything with a deadline:
//! - pending purchases past their TTL are failed
//! - access tokens past their expiry are revoked
//! - upload sessions stuck in `uploading` past their TTL are aborted against
//!   the storage backend and marked as errors

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

use cinevision_core::models::UploadStatus;
use cinevision_db::{PurchaseRepository, VideoUploadRepository};
use cinevision_storage::Storage;

#[derive(Clone)]
pub struct ExpirySweeperConfig {
    pub sweep_interval_secs: u64,
    pub pending_purchase_ttl_secs: i64,
    pub upload_session_ttl_secs: i64,
}

impl Default for ExpirySweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            pending_purchase_ttl_secs: 3600,
            upload_session_ttl_secs: 24 * 3600,
        }
    }
}

/// Background service that sweeps expired state.
pub struct ExpirySweeper {
    shutdown_tx: mpsc::Sender<()>,
}

impl ExpirySweeper {
    pub fn start(
        purchases: PurchaseRepository,
        uploads: VideoUploadRepository,
        storage: Arc<dyn Storage>,
        config: ExpirySweeperConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_loop(purchases, uploads, storage, config, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    pub async fn shutdown(&self) {
        self.shutdown_tx.send(()).await.ok();
    }

    async fn worker_loop(
        purchases: PurchaseRepository,
        uploads: VideoUploadRepository,
        storage: Arc<dyn Storage>,
        config: ExpirySweeperConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut sweep_interval = interval(Duration::from_secs(config.sweep_interval_secs));

        tracing::info!(
            sweep_interval_secs = config.sweep_interval_secs,
            pending_purchase_ttl_secs = config.pending_purchase_ttl_secs,
            upload_session_ttl_secs = config.upload_session_ttl_secs,
            "Expiry sweeper started"
        );

        loop {
            tokio::select! {
                _ = sweep_interval.tick() => {
                    if let Err(e) = Self::sweep(&purchases, &uploads, &storage, &config).await {
                        tracing::error!(error = %e, "Expiry sweep failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Expiry sweeper shutting down");
                    break;
                }
            }
        }
    }

    async fn sweep(
        purchases: &PurchaseRepository,
        uploads: &VideoUploadRepository,
        storage: &Arc<dyn Storage>,
        config: &ExpirySweeperConfig,
    ) -> anyhow::Result<()> {
        let expired_purchases = purchases
            .expire_stale_pending(config.pending_purchase_ttl_secs)
            .await?;
        if expired_purchases > 0 {
            tracing::info!(count = expired_purchases, "Expired stale pending purchases");
        }

        let revoked_tokens = purchases.clear_expired_tokens().await?;
        if revoked_tokens > 0 {
            tracing::info!(count = revoked_tokens, "Revoked expired access tokens");
        }

        let stale_uploads = uploads
            .list_stale_uploading(config.upload_session_ttl_secs)
            .await?;
        for upload in stale_uploads {
            // Abort first: finishing the provider-side session after we close
            // the row would leave an orphaned object.
            if let Err(e) = storage
                .abort_multipart_upload(&upload.storage_key, &upload.multipart_upload_id)
                .await
            {
                tracing::warn!(
                    upload_id = %upload.id,
                    error = %e,
                    "Failed to abort stale multipart upload, will retry next sweep"
                );
                continue;
            }

            uploads
                .mark_closed(
                    upload.id,
                    UploadStatus::Error,
                    Some("Upload session expired"),
                )
                .await?;
            tracing::info!(upload_id = %upload.id, "Closed stale upload session");
        }

        Ok(())
    }
}
