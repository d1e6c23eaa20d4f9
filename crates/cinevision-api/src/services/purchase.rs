use cinevision_core::models::{
    CreatePurchaseRequest, CreatePurchaseResponse, DeliveryChannel, FlowStatus,
    PurchaseStatusResponse,
};
use cinevision_core::{telegram_deep_link, AppError};
use cinevision_db::{ContentLanguageRepository, ContentRepository, PurchaseRepository};
use uuid::Uuid;

/// Opens purchases and answers status polls.
#[derive(Clone)]
pub struct PurchaseService {
    purchases: PurchaseRepository,
    content: ContentRepository,
    languages: ContentLanguageRepository,
    bot_username: String,
}

impl PurchaseService {
    pub fn new(
        purchases: PurchaseRepository,
        content: ContentRepository,
        languages: ContentLanguageRepository,
        bot_username: String,
    ) -> Self {
        Self {
            purchases,
            content,
            languages,
            bot_username,
        }
    }

    /// Open a pending purchase. The declared amount is checked against the
    /// catalog price before anything is written, so a stale client price
    /// never becomes a ledger row.
    pub async fn create(
        &self,
        request: CreatePurchaseRequest,
    ) -> Result<CreatePurchaseResponse, AppError> {
        let content = self
            .content
            .find_summary(request.content_id)
            .await?
            .filter(|c| c.published)
            .ok_or_else(|| AppError::NotFound(format!("Content {}", request.content_id)))?;

        let language = self
            .languages
            .find_by_id(request.content_language_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Content language {}", request.content_language_id))
            })?;
        if language.content_id != content.id {
            return Err(AppError::InvalidInput(format!(
                "Language variant {} does not belong to content {}",
                language.id, content.id
            )));
        }

        if request.amount_cents != content.price_cents
            || !request.currency.eq_ignore_ascii_case(&content.currency)
        {
            return Err(AppError::AmountMismatch {
                expected_cents: content.price_cents,
                declared_cents: request.amount_cents,
            });
        }

        let purchase = self
            .purchases
            .create(
                content.id,
                language.id,
                &request.identity,
                request.delivery_channel,
                content.price_cents,
                &content.currency,
            )
            .await?;

        tracing::info!(
            purchase_id = %purchase.id,
            content_id = %content.id,
            channel = %purchase.delivery_channel,
            "Purchase opened"
        );

        Ok(CreatePurchaseResponse {
            purchase_id: purchase.id,
            purchase_token: purchase.purchase_token,
            status: purchase.status,
            amount_cents: purchase.amount_cents,
            currency: purchase.currency,
            telegram_deep_link: telegram_deep_link(
                &self.bot_username,
                &purchase.purchase_token.to_string(),
            ),
            created_at: purchase.created_at,
        })
    }

    /// Public status view, keyed by the purchase token. The access grant and
    /// delivery link only appear while the purchase is paid and unexpired.
    pub async fn status(&self, purchase_token: Uuid) -> Result<PurchaseStatusResponse, AppError> {
        let purchase = self
            .purchases
            .find_by_token(purchase_token)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Purchase {}", purchase_token)))?;

        let live = purchase.has_live_access(chrono::Utc::now());
        // The paid deep link is bound to the access token so the bot can
        // resolve the grant directly from the start payload.
        let delivery_link = match (&purchase.access_token, purchase.delivery_channel) {
            (Some(token), DeliveryChannel::Telegram)
                if live && purchase.status == FlowStatus::Paid =>
            {
                Some(telegram_deep_link(&self.bot_username, token))
            }
            _ => None,
        };

        Ok(PurchaseStatusResponse {
            purchase_token: purchase.purchase_token,
            content_id: purchase.content_id,
            status: purchase.status,
            delivery_channel: purchase.delivery_channel,
            access_token: live.then(|| purchase.access_token.clone()).flatten(),
            access_expires_at: if live { purchase.access_expires_at } else { None },
            delivery_link,
        })
    }
}
