use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::FlowStatus;

/// Payment providers the webhook endpoint accepts events from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Pix,
    Stripe,
    Cryptomus,
    Manual,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Pix => "pix",
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Cryptomus => "cryptomus",
            PaymentProvider::Manual => "manual",
        }
    }
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pix" => Ok(PaymentProvider::Pix),
            "stripe" => Ok(PaymentProvider::Stripe),
            "cryptomus" => Ok(PaymentProvider::Cryptomus),
            "manual" => Ok(PaymentProvider::Manual),
            _ => Err(anyhow::anyhow!("Invalid payment provider: {}", s)),
        }
    }
}

/// Provider-specific detail carried alongside a payment, persisted as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderMeta {
    Pix {
        #[serde(skip_serializing_if = "Option::is_none")]
        e2e_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        qr_payload: Option<String>,
    },
    /// Purchases opened through the bot carry the buyer's chat so the paid
    /// notification can reach them directly.
    Telegram {
        telegram_user_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    Stripe {
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_intent: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        charge_id: Option<String>,
    },
    Cryptomus {
        #[serde(skip_serializing_if = "Option::is_none")]
        network: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        txid: Option<String>,
    },
    Manual {
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

impl ProviderMeta {
    /// Buyer chat id, when the provider event carries one.
    pub fn telegram_user_id(&self) -> Option<i64> {
        match self {
            ProviderMeta::Telegram {
                telegram_user_id, ..
            } => Some(*telegram_user_id),
            _ => None,
        }
    }
}

/// One payment attempt reported by a provider, keyed by
/// `(provider, provider_payment_id)` so redelivered events collapse onto the
/// same row.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub provider: PaymentProvider,
    /// The provider's own id for this payment.
    pub provider_payment_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: FlowStatus,
    /// How the buyer paid (`pix`, `card`, ...), as reported by the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ProviderMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for Payment {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let provider: String = row.try_get("provider")?;
        let status: String = row.try_get("status")?;
        let meta: Option<serde_json::Value> = row.try_get("meta")?;
        let meta = meta
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "meta".to_string(),
                source: Box::new(e),
            })?;

        Ok(Payment {
            id: row.try_get("id")?,
            purchase_id: row.try_get("purchase_id")?,
            provider: provider
                .parse()
                .map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
                    index: "provider".to_string(),
                    source: e.into(),
                })?,
            provider_payment_id: row.try_get("provider_payment_id")?,
            amount_cents: row.try_get("amount_cents")?,
            currency: row.try_get("currency")?,
            status: status
                .parse()
                .map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: e.into(),
                })?,
            payment_method: row.try_get("payment_method")?,
            meta,
            refund_id: row.try_get("refund_id")?,
            refund_amount_cents: row.try_get("refund_amount_cents")?,
            refund_reason: row.try_get("refund_reason")?,
            refunded_at: row.try_get("refunded_at")?,
            failure_reason: row.try_get("failure_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_meta_tagged_serialization() {
        let meta = ProviderMeta::Cryptomus {
            network: Some("TRON".to_string()),
            txid: Some("abc123".to_string()),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["provider"], "cryptomus");
        assert_eq!(json["network"], "TRON");

        let back: ProviderMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_telegram_meta_exposes_buyer_chat() {
        let meta = ProviderMeta::Telegram {
            telegram_user_id: 42,
            username: Some("buyer".to_string()),
        };
        assert_eq!(meta.telegram_user_id(), Some(42));

        let pix = ProviderMeta::Pix {
            e2e_id: Some("E12345".to_string()),
            qr_payload: None,
        };
        assert_eq!(pix.telegram_user_id(), None);

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["provider"], "telegram");
        assert_eq!(json["telegram_user_id"], 42);
    }

    #[test]
    fn test_provider_round_trip_through_text() {
        for provider in [
            PaymentProvider::Pix,
            PaymentProvider::Stripe,
            PaymentProvider::Cryptomus,
            PaymentProvider::Manual,
        ] {
            assert_eq!(
                provider.as_str().parse::<PaymentProvider>().unwrap(),
                provider
            );
        }
    }
}
