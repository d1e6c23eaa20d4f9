use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{FlowStatus, PaymentProvider, ProviderMeta};

/// Payment status vocabulary providers report, mapped onto the internal
/// state machine before any transition is attempted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WebhookPaymentStatus {
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

impl WebhookPaymentStatus {
    pub fn as_flow_status(&self) -> FlowStatus {
        match self {
            WebhookPaymentStatus::Paid => FlowStatus::Paid,
            WebhookPaymentStatus::Failed => FlowStatus::Failed,
            WebhookPaymentStatus::Cancelled => FlowStatus::Cancelled,
            WebhookPaymentStatus::Refunded => FlowStatus::Refunded,
        }
    }
}

/// Body of a signed payment webhook. The raw bytes are verified against the
/// signature header before this is deserialized.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PaymentWebhookPayload {
    pub purchase_token: Uuid,
    pub provider: PaymentProvider,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Provider payment id must be between 1 and 255 characters"
    ))]
    pub provider_payment_id: String,
    pub status: WebhookPaymentStatus,
    /// Amount the provider settled, verified against the purchase amount.
    #[validate(range(min = 0, message = "Amount cannot be negative"))]
    pub amount_cents: i64,
    pub currency: String,
    /// Unix seconds at which the provider emitted the event.
    pub timestamp: i64,
    /// How the buyer paid (`pix`, `card`, ...), when the provider says.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub meta: Option<ProviderMeta>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Refund detail, carried only on `refunded` events.
    #[serde(default)]
    pub refund_id: Option<String>,
    #[serde(default)]
    pub refund_amount_cents: Option<i64>,
    #[serde(default)]
    pub refund_reason: Option<String>,
}

/// Webhook acknowledgement. Providers retry on non-2xx, so handled and
/// ignored events both answer 200 with `processed` telling them apart.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentWebhookResponse {
    pub processed: bool,
    pub message: String,
}

impl PaymentWebhookResponse {
    pub fn processed(message: impl Into<String>) -> Self {
        Self {
            processed: true,
            message: message.into(),
        }
    }

    pub fn ignored(message: impl Into<String>) -> Self {
        Self {
            processed: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_method_and_refund_detail() {
        let json = serde_json::json!({
            "purchase_token": Uuid::new_v4(),
            "provider": "pix",
            "provider_payment_id": "pix-9",
            "status": "refunded",
            "amount_cents": 1990,
            "currency": "BRL",
            "timestamp": 1_700_000_000,
            "payment_method": "pix",
            "refund_id": "rf-1",
            "refund_amount_cents": 1990,
            "refund_reason": "buyer request"
        });

        let payload: PaymentWebhookPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.provider, PaymentProvider::Pix);
        assert_eq!(payload.payment_method.as_deref(), Some("pix"));
        assert_eq!(payload.refund_id.as_deref(), Some("rf-1"));
        assert_eq!(payload.refund_amount_cents, Some(1990));
        assert_eq!(payload.refund_reason.as_deref(), Some("buyer request"));
    }

    #[test]
    fn test_payload_refund_detail_defaults_to_none() {
        let json = serde_json::json!({
            "purchase_token": Uuid::new_v4(),
            "provider": "stripe",
            "provider_payment_id": "pi_1",
            "status": "paid",
            "amount_cents": 1990,
            "currency": "USD",
            "timestamp": 1_700_000_000,
            "meta": { "provider": "telegram", "telegram_user_id": 77 }
        });

        let payload: PaymentWebhookPayload = serde_json::from_value(json).unwrap();
        assert!(payload.payment_method.is_none());
        assert!(payload.refund_id.is_none());
        assert_eq!(
            payload.meta.and_then(|m| m.telegram_user_id()),
            Some(77)
        );
    }
}
