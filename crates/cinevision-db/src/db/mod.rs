//! Database repositories for data access layer
//!
//! Each repository owns one domain entity: the purchase ledger, payment
//! records, the content catalog, and video upload sessions. Status columns
//! are stored as text and parsed into enums at the row boundary.

pub mod content;
pub mod payments;
pub mod purchases;
pub mod transaction;
pub mod uploads;

pub use content::{ContentLanguageRepository, ContentRepository};
pub use payments::{NewPayment, PaymentRepository, RefundDetail};
pub use purchases::PurchaseRepository;
pub use uploads::VideoUploadRepository;
