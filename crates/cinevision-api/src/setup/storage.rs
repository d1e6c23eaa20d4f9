//! Storage backend setup

use anyhow::Result;
use cinevision_core::Config;
use cinevision_storage::{S3Storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = S3Storage::new(
        config.s3_bucket.clone(),
        config.s3_region.clone(),
        config.s3_endpoint.clone(),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to initialize S3 storage: {}", e))?;

    tracing::info!(
        bucket = %config.s3_bucket,
        region = %config.s3_region,
        endpoint = ?config.s3_endpoint,
        "Storage initialized"
    );

    Ok(Arc::new(storage))
}
