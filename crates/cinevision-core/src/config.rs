//! Configuration module
//!
//! Environment-driven configuration for the API binary and background
//! services. Loaded once at startup via [`Config::from_env`] and validated
//! before anything else is initialized.

use std::env;

use anyhow::{bail, Context};

const DEFAULT_SERVER_PORT: u16 = 3001;
const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;
const DEFAULT_SITE_ACCESS_TTL_HOURS: i64 = 24;
const DEFAULT_TELEGRAM_ACCESS_TTL_DAYS: i64 = 365;
const DEFAULT_PENDING_PURCHASE_TTL_SECS: i64 = 3600;
const DEFAULT_UPLOAD_SESSION_TTL_SECS: i64 = 86400;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,

    // Database
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    // Inbound payment webhooks
    pub webhook_secret: String,
    pub webhook_tolerance_secs: i64,

    // Admin surface (upload triad, progress socket)
    pub service_api_key: String,

    // Telegram delivery
    pub telegram_bot_token: Option<String>,
    pub telegram_bot_username: String,
    /// Override for the Bot API base URL (tests point this at a local server)
    pub telegram_api_base: String,
    /// Fallback chat for access notices when a buyer never opened the bot
    pub telegram_operator_chat_id: Option<String>,

    // Object storage
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,

    // Access grant policy
    pub site_access_ttl_hours: i64,
    pub telegram_access_ttl_days: i64,

    // Expiry sweep policy
    pub pending_purchase_ttl_secs: i64,
    pub upload_session_ttl_secs: i64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = Config {
            server_port: parse_var("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            db_timeout_seconds: parse_var("DB_TIMEOUT_SECONDS", DEFAULT_CONNECTION_TIMEOUT_SECS)?,
            webhook_secret: env::var("WEBHOOK_SECRET").context("WEBHOOK_SECRET must be set")?,
            webhook_tolerance_secs: parse_var(
                "WEBHOOK_TOLERANCE_SECS",
                DEFAULT_WEBHOOK_TOLERANCE_SECS,
            )?,
            service_api_key: env::var("SERVICE_API_KEY").context("SERVICE_API_KEY must be set")?,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_bot_username: env::var("TELEGRAM_BOT_USERNAME")
                .unwrap_or_else(|_| "CineVisionBot".to_string()),
            telegram_api_base: env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            telegram_operator_chat_id: env::var("TELEGRAM_OPERATOR_CHAT_ID").ok(),
            s3_bucket: env::var("S3_RAW_BUCKET").unwrap_or_else(|_| "cinevision-raw".to_string()),
            s3_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-2".to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            site_access_ttl_hours: parse_var(
                "SITE_ACCESS_TTL_HOURS",
                DEFAULT_SITE_ACCESS_TTL_HOURS,
            )?,
            telegram_access_ttl_days: parse_var(
                "TELEGRAM_ACCESS_TTL_DAYS",
                DEFAULT_TELEGRAM_ACCESS_TTL_DAYS,
            )?,
            pending_purchase_ttl_secs: parse_var(
                "PENDING_PURCHASE_TTL_SECS",
                DEFAULT_PENDING_PURCHASE_TTL_SECS,
            )?,
            upload_session_ttl_secs: parse_var(
                "UPLOAD_SESSION_TTL_SECS",
                DEFAULT_UPLOAD_SESSION_TTL_SECS,
            )?,
            sweep_interval_secs: parse_var("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
        };

        Ok(config)
    }

    /// Fail fast on configuration that would only surface as runtime errors later.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.webhook_secret.len() < 16 {
            bail!("WEBHOOK_SECRET must be at least 16 characters");
        }
        if self.service_api_key.len() < 16 {
            bail!("SERVICE_API_KEY must be at least 16 characters");
        }
        if self.webhook_tolerance_secs <= 0 {
            bail!("WEBHOOK_TOLERANCE_SECS must be positive");
        }
        if self.pending_purchase_ttl_secs <= 0 {
            bail!("PENDING_PURCHASE_TTL_SECS must be positive");
        }
        if self.is_production() && self.telegram_bot_token.is_none() {
            bail!("TELEGRAM_BOT_TOKEN must be set in production (telegram delivery)");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "production" | "prod")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 3001,
            environment: "development".to_string(),
            cors_origins: vec![],
            database_url: "postgres://localhost/cinevision".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 30,
            webhook_secret: "local-webhook-secret".to_string(),
            webhook_tolerance_secs: 300,
            service_api_key: "local-service-api-key".to_string(),
            telegram_bot_token: None,
            telegram_bot_username: "CineVisionBot".to_string(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            telegram_operator_chat_id: None,
            s3_bucket: "cinevision-raw".to_string(),
            s3_region: "us-east-2".to_string(),
            s3_endpoint: None,
            site_access_ttl_hours: 24,
            telegram_access_ttl_days: 365,
            pending_purchase_ttl_secs: 3600,
            upload_session_ttl_secs: 86400,
            sweep_interval_secs: 60,
        }
    }

    #[test]
    fn test_validate_accepts_development_without_bot_token() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_webhook_secret() {
        let mut config = base_config();
        config.webhook_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_bot_token_in_production() {
        let mut config = base_config();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());
        config.telegram_bot_token = Some("123456:token".to_string());
        assert!(config.validate().is_ok());
    }
}
