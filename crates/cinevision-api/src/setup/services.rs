//! Service and repository wiring

use anyhow::Result;
use cinevision_core::{AccessPolicy, Config, WebhookVerifier};
use cinevision_db::{
    ContentLanguageRepository, ContentRepository, PaymentRepository, PurchaseRepository,
    VideoUploadRepository,
};
use cinevision_infra::{
    ExpirySweeper, ExpirySweeperConfig, Notifier, NullNotifier, TelegramNotifier,
};
use cinevision_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

use crate::progress::ProgressHub;
use crate::services::{PaymentService, PurchaseService, UploadService};
use crate::state::AppState;

pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let purchases = PurchaseRepository::new(pool.clone());
    let payments = PaymentRepository::new(pool.clone());
    let content = ContentRepository::new(pool.clone());
    let languages = ContentLanguageRepository::new(pool.clone());
    let uploads = VideoUploadRepository::new(pool.clone());

    let verifier = WebhookVerifier::new(
        config.webhook_secret.clone(),
        config.webhook_tolerance_secs,
    );
    let policy = AccessPolicy {
        site_ttl_hours: config.site_access_ttl_hours,
        telegram_ttl_days: config.telegram_access_ttl_days,
    };

    let notifier: Arc<dyn Notifier> = match config.telegram_bot_token.as_deref() {
        Some(token) => {
            tracing::info!("Telegram notifier enabled");
            Arc::new(TelegramNotifier::new(
                config.telegram_api_base.clone(),
                token,
                config.telegram_operator_chat_id.clone(),
            ))
        }
        None => {
            tracing::info!("No Telegram bot token configured, notifications disabled");
            Arc::new(NullNotifier)
        }
    };

    let progress = ProgressHub::new();

    let purchase_service = PurchaseService::new(
        purchases.clone(),
        content.clone(),
        languages.clone(),
        config.telegram_bot_username.clone(),
    );
    let payment_service = PaymentService::new(
        purchases.clone(),
        payments,
        content.clone(),
        verifier,
        policy,
        notifier,
        config.telegram_bot_username.clone(),
    );
    let upload_service = UploadService::new(
        uploads.clone(),
        content,
        languages,
        storage.clone(),
        progress.clone(),
    );

    let sweeper = ExpirySweeper::start(
        purchases,
        uploads,
        storage.clone(),
        ExpirySweeperConfig {
            sweep_interval_secs: config.sweep_interval_secs,
            pending_purchase_ttl_secs: config.pending_purchase_ttl_secs,
            upload_session_ttl_secs: config.upload_session_ttl_secs,
        },
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        pool,
        storage,
        purchases: purchase_service,
        payments: payment_service,
        uploads: upload_service,
        progress,
        sweeper,
    }))
}
