//! Application state
//!
//! One shared state behind `Arc`, holding the services handlers dispatch
//! into plus the raw pool and storage handle for health checks.

use cinevision_core::Config;
use cinevision_infra::ExpirySweeper;
use cinevision_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

use crate::progress::ProgressHub;
use crate::services::{PaymentService, PurchaseService, UploadService};

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub purchases: PurchaseService,
    pub payments: PaymentService,
    pub uploads: UploadService,
    pub progress: ProgressHub,
    /// Held so the background sweep keeps running for the process lifetime.
    pub sweeper: ExpirySweeper,
}
