//! CineVision infrastructure library
//!
//! Shared infrastructure for the API service:
//! - Telemetry initialization
//! - Delivery notification (Telegram bot)
//! - Background expiry sweep (stale purchases, dead tokens, abandoned uploads)

pub mod notify;
pub mod sweep;
pub mod telemetry;

pub use notify::{AccessDelivery, Notifier, NullNotifier, TelegramNotifier};
pub use sweep::{ExpirySweeper, ExpirySweeperConfig};
pub use telemetry::init_telemetry;
