use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::FlowStatus;

/// Who is buying. Registered users carry an account id, guests a contact
/// string (email or phone) so the receipt can reach them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    Registered { user_id: Uuid },
    Guest { contact: String },
}

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::Registered { user_id } => Some(*user_id),
            Identity::Guest { .. } => None,
        }
    }

    pub fn guest_contact(&self) -> Option<&str> {
        match self {
            Identity::Registered { .. } => None,
            Identity::Guest { contact } => Some(contact.as_str()),
        }
    }

    /// Rebuild from the two nullable columns the ledger stores.
    pub fn from_columns(user_id: Option<Uuid>, guest_contact: Option<String>) -> Option<Identity> {
        match (user_id, guest_contact) {
            (Some(user_id), _) => Some(Identity::Registered { user_id }),
            (None, Some(contact)) => Some(Identity::Guest { contact }),
            (None, None) => None,
        }
    }
}

/// Where the access grant gets delivered once the purchase is paid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    /// Watch on the website; short-lived access token.
    Site,
    /// Deep link into the Telegram bot; longer-lived access token.
    Telegram,
}

impl DeliveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryChannel::Site => "site",
            DeliveryChannel::Telegram => "telegram",
        }
    }
}

impl std::fmt::Display for DeliveryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryChannel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site" => Ok(DeliveryChannel::Site),
            "telegram" => Ok(DeliveryChannel::Telegram),
            _ => Err(anyhow::anyhow!("Invalid delivery channel: {}", s)),
        }
    }
}

/// One row of the purchase ledger.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Purchase {
    pub id: Uuid,
    /// Opaque correlation token handed to the buyer and to the payment
    /// provider. Not the access token.
    pub purchase_token: Uuid,
    pub content_id: Uuid,
    /// Which language/dub variant of the content was bought.
    pub content_language_id: Uuid,
    pub identity: Identity,
    pub delivery_channel: DeliveryChannel,
    /// Price at purchase time, in the smallest currency unit.
    pub amount_cents: i64,
    pub currency: String,
    pub status: FlowStatus,
    /// Set exactly when status is `paid`; cleared again on refund or expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// An access token counts only while the purchase is paid and the token
    /// has not passed its expiry.
    pub fn has_live_access(&self, now: DateTime<Utc>) -> bool {
        self.status == FlowStatus::Paid
            && self.access_token.is_some()
            && self.access_expires_at.is_some_and(|exp| exp > now)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for Purchase {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let status: String = row.try_get("status")?;
        let channel: String = row.try_get("delivery_channel")?;
        let identity = Identity::from_columns(
            row.try_get("user_id")?,
            row.try_get("guest_contact")?,
        )
        .ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "user_id".to_string(),
            source: anyhow::anyhow!("Purchase row has neither user_id nor guest_contact").into(),
        })?;

        Ok(Purchase {
            id: row.try_get("id")?,
            purchase_token: row.try_get("purchase_token")?,
            content_id: row.try_get("content_id")?,
            content_language_id: row.try_get("content_language_id")?,
            identity,
            delivery_channel: channel.parse().map_err(|e: anyhow::Error| {
                sqlx::Error::ColumnDecode {
                    index: "delivery_channel".to_string(),
                    source: e.into(),
                }
            })?,
            amount_cents: row.try_get("amount_cents")?,
            currency: row.try_get("currency")?,
            status: status
                .parse()
                .map_err(|e: anyhow::Error| sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: e.into(),
                })?,
            access_token: row.try_get("access_token")?,
            access_expires_at: row.try_get("access_expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Request to open a purchase for one content language variant.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePurchaseRequest {
    pub content_id: Uuid,
    pub content_language_id: Uuid,
    pub identity: Identity,
    pub delivery_channel: DeliveryChannel,
    /// Price the client saw, in the smallest currency unit. Verified against
    /// the catalog before the purchase is accepted.
    #[validate(range(min = 1, message = "Amount must be at least 1 cent"))]
    pub amount_cents: i64,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatePurchaseResponse {
    pub purchase_id: Uuid,
    /// Token the client passes to the payment provider and polls status with.
    pub purchase_token: Uuid,
    pub status: FlowStatus,
    pub amount_cents: i64,
    pub currency: String,
    /// Opens the bot with the purchase token preloaded, so the buyer can
    /// follow the purchase from Telegram whatever the delivery channel.
    pub telegram_deep_link: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a purchase, keyed by purchase token.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseStatusResponse {
    pub purchase_token: Uuid,
    pub content_id: Uuid,
    pub status: FlowStatus,
    pub delivery_channel: DeliveryChannel,
    /// Present only while the purchase is paid and unexpired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_expires_at: Option<DateTime<Utc>>,
    /// Telegram deep link, present for paid telegram deliveries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn paid_purchase(now: DateTime<Utc>) -> Purchase {
        Purchase {
            id: Uuid::new_v4(),
            purchase_token: Uuid::new_v4(),
            content_id: Uuid::new_v4(),
            content_language_id: Uuid::new_v4(),
            identity: Identity::Guest {
                contact: "buyer@example.com".to_string(),
            },
            delivery_channel: DeliveryChannel::Site,
            amount_cents: 499,
            currency: "USD".to_string(),
            status: FlowStatus::Paid,
            access_token: Some("ab".repeat(32)),
            access_expires_at: Some(now + Duration::hours(24)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_live_access_requires_paid_and_unexpired() {
        let now = Utc::now();
        let purchase = paid_purchase(now);
        assert!(purchase.has_live_access(now));

        let mut expired = paid_purchase(now);
        expired.access_expires_at = Some(now - Duration::minutes(1));
        assert!(!expired.has_live_access(now));

        let mut refunded = paid_purchase(now);
        refunded.status = FlowStatus::Refunded;
        assert!(!refunded.has_live_access(now));
    }

    #[test]
    fn test_create_response_serializes_deep_link() {
        let now = Utc::now();
        let token = Uuid::new_v4();
        let response = CreatePurchaseResponse {
            purchase_id: Uuid::new_v4(),
            purchase_token: token,
            status: FlowStatus::Pending,
            amount_cents: 499,
            currency: "USD".to_string(),
            telegram_deep_link: format!("https://t.me/cinevision_bot?start={}", token),
            created_at: now,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json["telegram_deep_link"],
            format!("https://t.me/cinevision_bot?start={}", token)
        );
    }

    #[test]
    fn test_identity_column_round_trip() {
        let user_id = Uuid::new_v4();
        assert_eq!(
            Identity::from_columns(Some(user_id), None),
            Some(Identity::Registered { user_id })
        );
        assert_eq!(
            Identity::from_columns(None, Some("x@y.z".to_string())),
            Some(Identity::Guest {
                contact: "x@y.z".to_string()
            })
        );
        assert_eq!(Identity::from_columns(None, None), None);
    }
}
