//! Domain services
//!
//! Handlers stay thin; the purchase flow, payment processing, and upload
//! tracking live here so they can be tested without HTTP.

pub mod payment;
pub mod purchase;
pub mod upload;

pub use payment::PaymentService;
pub use purchase::PurchaseService;
pub use upload::UploadService;
