//! OpenAPI documentation.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use cinevision_core::models;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "service_api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CineVision API",
        version = "0.1.0",
        description = "Pay-per-title video platform core (v0): purchase ledger, signed payment webhooks, access delivery, and multipart video uploads. All endpoints are versioned under /api/v0/."
    ),
    paths(
        // Purchases
        handlers::purchases::create_purchase,
        handlers::purchases::purchase_status,
        // Webhooks
        handlers::payment_webhook::payment_webhook,
        // Uploads
        handlers::uploads::initiate_multipart,
        handlers::uploads::part_progress,
        handlers::uploads::complete_multipart,
        handlers::uploads::cancel_multipart,
        handlers::uploads::upload_status,
        handlers::progress_ws::progress_snapshot,
    ),
    components(schemas(
        models::CreatePurchaseRequest,
        models::CreatePurchaseResponse,
        models::PurchaseStatusResponse,
        models::Identity,
        models::DeliveryChannel,
        models::FlowStatus,
        models::PaymentProvider,
        models::ProviderMeta,
        models::PaymentWebhookPayload,
        models::PaymentWebhookResponse,
        models::WebhookPaymentStatus,
        models::LanguageType,
        models::InitiateMultipartRequest,
        models::InitiateMultipartResponse,
        models::PresignedPartUrl,
        models::PartProgressRequest,
        models::CompleteMultipartRequest,
        models::CompleteMultipartResponse,
        models::CompletedUploadPart,
        models::UploadStatus,
        models::UploadStatusResponse,
        models::UploadProgress,
        error::ErrorResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "purchases", description = "Purchase ledger and status polling"),
        (name = "webhooks", description = "Signed payment provider callbacks"),
        (name = "uploads", description = "Admin multipart video uploads")
    )
)]
pub struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
