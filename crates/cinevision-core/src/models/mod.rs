//! Domain models
//!
//! Entities and request/response types shared across the workspace.
//! Status enums live in `status` and carry the transition rules; repositories
//! persist them as text and parse them back through `FromStr`.

pub mod content;
pub mod payment;
pub mod purchase;
pub mod status;
pub mod upload;
pub mod webhook;

pub use content::{ContentLanguage, ContentSummary, LanguageType};
pub use payment::{Payment, PaymentProvider, ProviderMeta};
pub use purchase::{
    CreatePurchaseRequest, CreatePurchaseResponse, DeliveryChannel, Identity, Purchase,
    PurchaseStatusResponse,
};
pub use status::{FlowStatus, UploadStatus};
pub use upload::{
    part_count, CompleteMultipartRequest, CompleteMultipartResponse, CompletedUploadPart,
    InitiateMultipartRequest, InitiateMultipartResponse, PartProgressRequest, PresignedPartUrl,
    UploadProgress, UploadStatusResponse, VideoUpload,
};
pub use webhook::{PaymentWebhookPayload, PaymentWebhookResponse, WebhookPaymentStatus};
