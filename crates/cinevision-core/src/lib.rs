//! CineVision core library
//!
//! Shared domain types and logic for the CineVision purchase/delivery core:
//! - Configuration loading from environment variables
//! - Unified error type (`AppError`) with HTTP response metadata
//! - Domain models (Purchase, Payment, ContentLanguage, VideoUpload)
//! - Purchase/payment/upload state machine rules
//! - Access token minting and webhook signature verification

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod signature;
pub mod token;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use signature::{SignatureError, WebhookVerifier};
pub use token::{telegram_deep_link, AccessGrant, AccessPolicy};
