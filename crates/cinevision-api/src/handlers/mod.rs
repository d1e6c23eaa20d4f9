pub mod payment_webhook;
pub mod progress_ws;
pub mod purchases;
pub mod uploads;
