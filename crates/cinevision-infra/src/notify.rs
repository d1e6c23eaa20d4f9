//! Delivery notification
//!
//! After a purchase goes paid, the buyer gets told where to watch. For
//! telegram deliveries that means a bot message with the deep link. Delivery
//! is best-effort: a failed notification never rolls back a paid purchase,
//! the buyer can still poll the status endpoint for their grant.

use async_trait::async_trait;
use cinevision_core::models::DeliveryChannel;
use cinevision_core::AppError;
use serde_json::json;
use uuid::Uuid;

/// What gets delivered once a purchase is paid.
#[derive(Debug, Clone)]
pub struct AccessDelivery {
    pub purchase_token: Uuid,
    pub content_title: String,
    pub delivery_channel: DeliveryChannel,
    /// Buyer's Telegram chat, carried on the provider event when the
    /// purchase was opened through the bot.
    pub chat_id: Option<i64>,
    /// Telegram deep link bound to the access token, present for telegram
    /// deliveries.
    pub deep_link: Option<String>,
    /// Guest contact, when the buyer has no account.
    pub contact: Option<String>,
}

/// Notification seam. The API service holds this behind an `Arc<dyn _>` so
/// tests can swap in a recording fake.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_access_granted(&self, delivery: &AccessDelivery) -> Result<(), AppError>;
}

/// Sends delivery messages through the Telegram bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    /// Operator chat that receives delivery events the bot cannot route to a
    /// buyer (guest purchases without a telegram chat).
    fallback_chat_id: Option<String>,
}

impl TelegramNotifier {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        fallback_chat_id: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            fallback_chat_id,
        }
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| AppError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::NotificationFailed(format!(
                "Telegram API returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_access_granted(&self, delivery: &AccessDelivery) -> Result<(), AppError> {
        // The buyer's own chat when the payment event carried one, the
        // operator chat otherwise.
        let (chat_id, text) = match delivery.chat_id {
            Some(buyer_chat) => {
                let text = match delivery.deep_link.as_deref() {
                    Some(link) => format!(
                        "Your purchase of \"{}\" is paid. Watch it here: {}",
                        delivery.content_title, link
                    ),
                    None => format!(
                        "Your purchase of \"{}\" is paid. Open the site to watch.",
                        delivery.content_title
                    ),
                };
                (buyer_chat.to_string(), text)
            }
            None => {
                let Some(operator_chat) = self.fallback_chat_id.clone() else {
                    tracing::warn!(
                        purchase_token = %delivery.purchase_token,
                        "No buyer chat on the payment event and no operator chat configured, \
                         delivery notification dropped"
                    );
                    return Ok(());
                };
                let text = match delivery.deep_link.as_deref() {
                    Some(link) => format!(
                        "Purchase {} paid: \"{}\"\nDelivery: {}",
                        delivery.purchase_token, delivery.content_title, link
                    ),
                    None => format!(
                        "Purchase {} paid: \"{}\" (site delivery)",
                        delivery.purchase_token, delivery.content_title
                    ),
                };
                (operator_chat, text)
            }
        };

        self.send_message(&chat_id, &text).await
    }
}

/// No-op notifier for deployments without a bot token.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify_access_granted(&self, delivery: &AccessDelivery) -> Result<(), AppError> {
        tracing::debug!(
            purchase_token = %delivery.purchase_token,
            channel = %delivery.delivery_channel,
            "Notifications disabled, skipping delivery message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(chat_id: Option<i64>) -> AccessDelivery {
        AccessDelivery {
            purchase_token: Uuid::new_v4(),
            content_title: "Blade Runner".to_string(),
            delivery_channel: DeliveryChannel::Telegram,
            chat_id,
            deep_link: Some("https://t.me/cinevision_bot?start=abc".to_string()),
            contact: None,
        }
    }

    // The endpoint is unroutable, so an attempted send fails fast. What the
    // tests pin down is whether a send is attempted at all.
    fn unroutable_notifier(fallback: Option<String>) -> TelegramNotifier {
        TelegramNotifier::new("http://127.0.0.1:1", "test-token", fallback)
    }

    #[tokio::test]
    async fn test_buyer_chat_gets_a_send_attempt() {
        let notifier = unroutable_notifier(None);
        let result = notifier.notify_access_granted(&delivery(Some(777))).await;
        assert!(matches!(result, Err(AppError::NotificationFailed(_))));
    }

    #[tokio::test]
    async fn test_operator_chat_backs_up_missing_buyer_chat() {
        let notifier = unroutable_notifier(Some("1234".to_string()));
        let result = notifier.notify_access_granted(&delivery(None)).await;
        assert!(matches!(result, Err(AppError::NotificationFailed(_))));
    }

    #[tokio::test]
    async fn test_no_route_at_all_drops_quietly() {
        let notifier = unroutable_notifier(None);
        let result = notifier.notify_access_granted(&delivery(None)).await;
        assert!(result.is_ok());
    }
}
