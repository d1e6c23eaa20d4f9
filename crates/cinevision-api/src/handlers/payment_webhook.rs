use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use bytes::Bytes;
use cinevision_core::models::PaymentWebhookResponse;
use cinevision_core::signature::SIGNATURE_HEADER;
use std::sync::Arc;

/// Receive a signed payment event from a provider
///
/// The signature is verified over the raw body before anything is parsed.
/// Handled, redelivered, and out-of-order events all answer 200 so the
/// provider stops retrying; only bad signatures, malformed payloads, and
/// amount mismatches are rejected.
#[utoipa::path(
    post,
    path = "/api/v0/webhooks/payment",
    tag = "webhooks",
    request_body = cinevision_core::models::PaymentWebhookPayload,
    responses(
        (status = 200, description = "Event handled or acknowledged as repeat", body = PaymentWebhookResponse),
        (status = 400, description = "Malformed payload or amount mismatch", body = ErrorResponse),
        (status = 401, description = "Missing, invalid, or stale signature", body = ErrorResponse),
        (status = 404, description = "Unknown purchase token", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "payment_webhook"))]
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let response = state.payments.handle_webhook(&body, signature).await?;
    Ok(Json(response))
}
