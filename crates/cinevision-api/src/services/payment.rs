use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinevision_core::models::{
    ContentSummary, DeliveryChannel, FlowStatus, Payment, PaymentWebhookPayload,
    PaymentWebhookResponse, ProviderMeta, Purchase, WebhookPaymentStatus,
};
use cinevision_core::{telegram_deep_link, AccessPolicy, AppError, WebhookVerifier};
use cinevision_db::{
    ContentRepository, NewPayment, PaymentRepository, PurchaseRepository, RefundDetail,
};
use cinevision_infra::{AccessDelivery, Notifier};
use uuid::Uuid;
use validator::Validate;

/// Purchase ledger operations the webhook flow drives. Production wires in
/// `PurchaseRepository`; tests drive the service with in-memory fakes.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn find_by_token(&self, purchase_token: Uuid) -> Result<Option<Purchase>, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Purchase>, AppError>;
    async fn mark_paid(
        &self,
        id: Uuid,
        access_token: &str,
        access_expires_at: DateTime<Utc>,
    ) -> Result<Option<Purchase>, AppError>;
    async fn mark_closed(&self, id: Uuid, to: FlowStatus) -> Result<Option<Purchase>, AppError>;
    async fn mark_refunded(&self, id: Uuid) -> Result<Option<Purchase>, AppError>;
}

/// Payment record operations the webhook flow drives.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn upsert(&self, new: NewPayment<'_>) -> Result<Payment, AppError>;
    async fn transition(
        &self,
        id: Uuid,
        from: FlowStatus,
        to: FlowStatus,
        failure_reason: Option<&str>,
        refund: RefundDetail<'_>,
    ) -> Result<Option<Payment>, AppError>;
}

/// Catalog lookups used to word delivery messages.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_summary(&self, id: Uuid) -> Result<Option<ContentSummary>, AppError>;
}

#[async_trait]
impl PurchaseStore for PurchaseRepository {
    async fn find_by_token(&self, purchase_token: Uuid) -> Result<Option<Purchase>, AppError> {
        PurchaseRepository::find_by_token(self, purchase_token).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Purchase>, AppError> {
        PurchaseRepository::find_by_id(self, id).await
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        access_token: &str,
        access_expires_at: DateTime<Utc>,
    ) -> Result<Option<Purchase>, AppError> {
        PurchaseRepository::mark_paid(self, id, access_token, access_expires_at).await
    }

    async fn mark_closed(&self, id: Uuid, to: FlowStatus) -> Result<Option<Purchase>, AppError> {
        PurchaseRepository::mark_closed(self, id, to).await
    }

    async fn mark_refunded(&self, id: Uuid) -> Result<Option<Purchase>, AppError> {
        PurchaseRepository::mark_refunded(self, id).await
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn upsert(&self, new: NewPayment<'_>) -> Result<Payment, AppError> {
        PaymentRepository::upsert(self, new).await
    }

    async fn transition(
        &self,
        id: Uuid,
        from: FlowStatus,
        to: FlowStatus,
        failure_reason: Option<&str>,
        refund: RefundDetail<'_>,
    ) -> Result<Option<Payment>, AppError> {
        PaymentRepository::transition(self, id, from, to, failure_reason, refund).await
    }
}

#[async_trait]
impl CatalogStore for ContentRepository {
    async fn find_summary(&self, id: Uuid) -> Result<Option<ContentSummary>, AppError> {
        ContentRepository::find_summary(self, id).await
    }
}

/// Turns signed provider webhooks into purchase and payment transitions.
///
/// Webhook processing is idempotent: a redelivered event lands on the payment
/// row it created the first time and the purchase CAS collapses repeats into
/// an acknowledged no-op.
#[derive(Clone)]
pub struct PaymentService<
    P = PurchaseRepository,
    Y = PaymentRepository,
    C = ContentRepository,
> {
    purchases: P,
    payments: Y,
    content: C,
    verifier: WebhookVerifier,
    policy: AccessPolicy,
    notifier: Arc<dyn Notifier>,
    bot_username: String,
}

impl<P, Y, C> PaymentService<P, Y, C>
where
    P: PurchaseStore,
    Y: PaymentStore,
    C: CatalogStore,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        purchases: P,
        payments: Y,
        content: C,
        verifier: WebhookVerifier,
        policy: AccessPolicy,
        notifier: Arc<dyn Notifier>,
        bot_username: String,
    ) -> Self {
        Self {
            purchases,
            payments,
            content,
            verifier,
            policy,
            notifier,
            bot_username,
        }
    }

    /// Verify, parse, and apply one webhook. Signature runs over the raw
    /// bytes before any deserialization.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<PaymentWebhookResponse, AppError> {
        self.verifier.verify(body, signature_header)?;

        let payload: PaymentWebhookPayload = serde_json::from_slice(body)?;
        payload.validate()?;
        self.verifier
            .check_timestamp(payload.timestamp, chrono::Utc::now().timestamp())?;

        self.process(payload).await
    }

    async fn process(
        &self,
        payload: PaymentWebhookPayload,
    ) -> Result<PaymentWebhookResponse, AppError> {
        let purchase = self
            .purchases
            .find_by_token(payload.purchase_token)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Purchase {}", payload.purchase_token))
            })?;

        // Record the provider event first so every webhook leaves a payment
        // row, even when the purchase transition turns out to be a repeat.
        // A fresh row is created already carrying the incoming status; an
        // existing row moves forward only along the state machine.
        let to = payload.status.as_flow_status();

        // Possible tampering. Checked before anything transitions.
        if payload.status == WebhookPaymentStatus::Paid
            && payload.amount_cents != purchase.amount_cents
        {
            return Err(AppError::AmountMismatch {
                expected_cents: purchase.amount_cents,
                declared_cents: payload.amount_cents,
            });
        }

        let refund = RefundDetail {
            refund_id: payload.refund_id.as_deref(),
            refund_amount_cents: payload.refund_amount_cents,
            refund_reason: payload.refund_reason.as_deref(),
        };
        let payment = self
            .payments
            .upsert(NewPayment {
                purchase_id: purchase.id,
                provider: payload.provider,
                provider_payment_id: &payload.provider_payment_id,
                amount_cents: payload.amount_cents,
                currency: &payload.currency,
                status: to,
                payment_method: payload.payment_method.as_deref(),
                meta: payload.meta.as_ref(),
                failure_reason: payload.failure_reason.as_deref(),
                refund,
            })
            .await?;

        if payment.status != to {
            if !payment.status.can_transition(to) {
                // Out-of-order redelivery. The event is recorded; answer 200
                // so the provider stops retrying.
                tracing::warn!(
                    payment_id = %payment.id,
                    from = %payment.status,
                    to = %to,
                    "Ignoring out-of-order payment transition"
                );
                return Ok(PaymentWebhookResponse::ignored(format!(
                    "Payment transition {} -> {} not applied",
                    payment.status, to
                )));
            }
            self.payments
                .transition(
                    payment.id,
                    payment.status,
                    to,
                    payload.failure_reason.as_deref(),
                    refund,
                )
                .await?;
        }

        match payload.status {
            WebhookPaymentStatus::Paid => {
                let grant = self
                    .policy
                    .mint(purchase.delivery_channel, chrono::Utc::now());
                match self
                    .purchases
                    .mark_paid(purchase.id, &grant.token, grant.expires_at)
                    .await?
                {
                    Some(paid) => {
                        tracing::info!(
                            purchase_id = %paid.id,
                            provider = %payload.provider,
                            "Purchase paid, access granted"
                        );
                        let buyer_chat = payload
                            .meta
                            .as_ref()
                            .and_then(ProviderMeta::telegram_user_id);
                        self.deliver(&paid, buyer_chat).await;
                        Ok(PaymentWebhookResponse::processed("Purchase marked paid"))
                    }
                    None => self.already_settled(&purchase, FlowStatus::Paid).await,
                }
            }
            WebhookPaymentStatus::Failed | WebhookPaymentStatus::Cancelled => {
                match self.purchases.mark_closed(purchase.id, to).await? {
                    Some(_) => Ok(PaymentWebhookResponse::processed(format!(
                        "Purchase marked {}",
                        to
                    ))),
                    None => self.already_settled(&purchase, to).await,
                }
            }
            WebhookPaymentStatus::Refunded => {
                match self.purchases.mark_refunded(purchase.id).await? {
                    Some(refunded) => {
                        tracing::info!(
                            purchase_id = %refunded.id,
                            "Purchase refunded, access revoked"
                        );
                        Ok(PaymentWebhookResponse::processed("Purchase refunded"))
                    }
                    None => self.already_settled(&purchase, FlowStatus::Refunded).await,
                }
            }
        }
    }

    /// The CAS did not fire. Re-read to tell a harmless repeat apart from an
    /// out-of-order edge. Either way the event is durably recorded, so the
    /// provider gets a 200 and stops redelivering; the illegal edge is only
    /// logged.
    async fn already_settled(
        &self,
        purchase: &Purchase,
        wanted: FlowStatus,
    ) -> Result<PaymentWebhookResponse, AppError> {
        let current = self
            .purchases
            .find_by_id(purchase.id)
            .await?
            .map(|p| p.status)
            .unwrap_or(purchase.status);

        if current == wanted {
            Ok(PaymentWebhookResponse::ignored(format!(
                "Purchase already {}",
                current
            )))
        } else {
            tracing::warn!(
                purchase_id = %purchase.id,
                from = %current,
                to = %wanted,
                "Ignoring out-of-order purchase transition"
            );
            Ok(PaymentWebhookResponse::ignored(format!(
                "Transition {} -> {} not applied",
                current, wanted
            )))
        }
    }

    /// Best-effort delivery. A failed notification is logged, never bubbled:
    /// the buyer can always poll the status endpoint for their grant.
    ///
    /// Telegram deliveries go to the buyer's chat when the provider event
    /// carried one, with the deep link bound to the freshly minted access
    /// token.
    async fn deliver(&self, purchase: &Purchase, buyer_chat_id: Option<i64>) {
        let title = match self.content.find_summary(purchase.content_id).await {
            Ok(Some(content)) => content.title,
            _ => purchase.content_id.to_string(),
        };

        let deep_link = match (purchase.delivery_channel, purchase.access_token.as_deref()) {
            (DeliveryChannel::Telegram, Some(token)) => {
                Some(telegram_deep_link(&self.bot_username, token))
            }
            _ => None,
        };

        let delivery = AccessDelivery {
            purchase_token: purchase.purchase_token,
            content_title: title,
            delivery_channel: purchase.delivery_channel,
            chat_id: buyer_chat_id,
            deep_link,
            contact: purchase.identity.guest_contact().map(str::to_string),
        };

        if let Err(e) = self.notifier.notify_access_granted(&delivery).await {
            tracing::warn!(
                purchase_id = %purchase.id,
                error = %e,
                "Delivery notification failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinevision_core::models::{Identity, PaymentProvider};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct FakeLedger {
        rows: Arc<Mutex<HashMap<Uuid, Purchase>>>,
        paid_cas_wins: Arc<Mutex<u32>>,
    }

    impl FakeLedger {
        fn seed_pending(&self, amount_cents: i64) -> Purchase {
            let now = Utc::now();
            let purchase = Purchase {
                id: Uuid::new_v4(),
                purchase_token: Uuid::new_v4(),
                content_id: Uuid::new_v4(),
                content_language_id: Uuid::new_v4(),
                identity: Identity::Guest {
                    contact: "buyer@example.com".to_string(),
                },
                delivery_channel: DeliveryChannel::Telegram,
                amount_cents,
                currency: "USD".to_string(),
                status: FlowStatus::Pending,
                access_token: None,
                access_expires_at: None,
                created_at: now,
                updated_at: now,
            };
            self.rows
                .lock()
                .unwrap()
                .insert(purchase.id, purchase.clone());
            purchase
        }

        fn get(&self, id: Uuid) -> Purchase {
            self.rows.lock().unwrap().get(&id).unwrap().clone()
        }

        fn paid_cas_wins(&self) -> u32 {
            *self.paid_cas_wins.lock().unwrap()
        }
    }

    #[async_trait]
    impl PurchaseStore for FakeLedger {
        async fn find_by_token(
            &self,
            purchase_token: Uuid,
        ) -> Result<Option<Purchase>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|p| p.purchase_token == purchase_token)
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Purchase>, AppError> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn mark_paid(
            &self,
            id: Uuid,
            access_token: &str,
            access_expires_at: DateTime<Utc>,
        ) -> Result<Option<Purchase>, AppError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            if row.status != FlowStatus::Pending {
                return Ok(None);
            }
            row.status = FlowStatus::Paid;
            row.access_token = Some(access_token.to_string());
            row.access_expires_at = Some(access_expires_at);
            *self.paid_cas_wins.lock().unwrap() += 1;
            Ok(Some(row.clone()))
        }

        async fn mark_closed(
            &self,
            id: Uuid,
            to: FlowStatus,
        ) -> Result<Option<Purchase>, AppError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            if row.status != FlowStatus::Pending {
                return Ok(None);
            }
            row.status = to;
            Ok(Some(row.clone()))
        }

        async fn mark_refunded(&self, id: Uuid) -> Result<Option<Purchase>, AppError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            if row.status != FlowStatus::Paid {
                return Ok(None);
            }
            row.status = FlowStatus::Refunded;
            row.access_token = None;
            row.access_expires_at = None;
            Ok(Some(row.clone()))
        }
    }

    #[derive(Clone, Default)]
    struct FakePayments {
        rows: Arc<Mutex<HashMap<(String, String), Payment>>>,
    }

    impl FakePayments {
        fn get(&self, provider: PaymentProvider, provider_payment_id: &str) -> Payment {
            self.rows
                .lock()
                .unwrap()
                .get(&(provider.to_string(), provider_payment_id.to_string()))
                .unwrap()
                .clone()
        }
    }

    #[async_trait]
    impl PaymentStore for FakePayments {
        async fn upsert(&self, new: NewPayment<'_>) -> Result<Payment, AppError> {
            let key = (new.provider.to_string(), new.provider_payment_id.to_string());
            let mut rows = self.rows.lock().unwrap();
            if let Some(existing) = rows.get(&key) {
                return Ok(existing.clone());
            }
            let now = Utc::now();
            let payment = Payment {
                id: Uuid::new_v4(),
                purchase_id: new.purchase_id,
                provider: new.provider,
                provider_payment_id: new.provider_payment_id.to_string(),
                amount_cents: new.amount_cents,
                currency: new.currency.to_string(),
                status: new.status,
                payment_method: new.payment_method.map(str::to_string),
                meta: new.meta.cloned(),
                refund_id: new.refund.refund_id.map(str::to_string),
                refund_amount_cents: new.refund.refund_amount_cents,
                refund_reason: new.refund.refund_reason.map(str::to_string),
                refunded_at: (new.status == FlowStatus::Refunded).then_some(now),
                failure_reason: new.failure_reason.map(str::to_string),
                created_at: now,
                updated_at: now,
            };
            rows.insert(key, payment.clone());
            Ok(payment)
        }

        async fn transition(
            &self,
            id: Uuid,
            from: FlowStatus,
            to: FlowStatus,
            failure_reason: Option<&str>,
            refund: RefundDetail<'_>,
        ) -> Result<Option<Payment>, AppError> {
            if !from.can_transition(to) {
                return Err(AppError::IllegalStateTransition {
                    entity: "payment",
                    id: id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            let mut rows = self.rows.lock().unwrap();
            let row = rows.values_mut().find(|p| p.id == id);
            let Some(row) = row.filter(|p| p.status == from) else {
                return Ok(None);
            };
            row.status = to;
            if let Some(reason) = failure_reason {
                row.failure_reason = Some(reason.to_string());
            }
            if to == FlowStatus::Refunded {
                row.refund_id = refund.refund_id.map(str::to_string);
                row.refund_amount_cents = refund.refund_amount_cents;
                row.refund_reason = refund.refund_reason.map(str::to_string);
                row.refunded_at = Some(Utc::now());
            }
            Ok(Some(row.clone()))
        }
    }

    #[derive(Clone, Default)]
    struct FakeCatalog;

    #[async_trait]
    impl CatalogStore for FakeCatalog {
        async fn find_summary(&self, id: Uuid) -> Result<Option<ContentSummary>, AppError> {
            Ok(Some(ContentSummary {
                id,
                title: "Blade Runner".to_string(),
                price_cents: 1990,
                currency: "USD".to_string(),
                published: true,
                created_at: Utc::now(),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        deliveries: Mutex<Vec<AccessDelivery>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_access_granted(
            &self,
            delivery: &AccessDelivery,
        ) -> Result<(), AppError> {
            self.deliveries.lock().unwrap().push(delivery.clone());
            Ok(())
        }
    }

    const SECRET: &str = "webhook-test-secret";

    fn service(
        ledger: FakeLedger,
        payments: FakePayments,
        notifier: Arc<RecordingNotifier>,
    ) -> PaymentService<FakeLedger, FakePayments, FakeCatalog> {
        PaymentService::new(
            ledger,
            payments,
            FakeCatalog,
            WebhookVerifier::new(SECRET.to_string(), 300),
            AccessPolicy {
                site_ttl_hours: 24,
                telegram_ttl_days: 30,
            },
            notifier,
            "cinevision_bot".to_string(),
        )
    }

    fn signed(body: &serde_json::Value) -> (Vec<u8>, String) {
        let bytes = serde_json::to_vec(body).unwrap();
        let signature = WebhookVerifier::new(SECRET.to_string(), 300)
            .sign(&bytes)
            .unwrap();
        (bytes, signature)
    }

    fn paid_event(purchase: &Purchase, provider_payment_id: &str) -> serde_json::Value {
        serde_json::json!({
            "purchase_token": purchase.purchase_token,
            "provider": "pix",
            "provider_payment_id": provider_payment_id,
            "status": "paid",
            "amount_cents": purchase.amount_cents,
            "currency": purchase.currency,
            "timestamp": Utc::now().timestamp(),
            "payment_method": "pix",
            "meta": { "provider": "telegram", "telegram_user_id": 777 }
        })
    }

    #[tokio::test]
    async fn test_redelivered_paid_webhook_transitions_and_mints_once() {
        let ledger = FakeLedger::default();
        let payments = FakePayments::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let purchase = ledger.seed_pending(1990);
        let svc = service(ledger.clone(), payments, notifier.clone());

        let (body, sig) = signed(&paid_event(&purchase, "pix-1"));

        let first = svc.handle_webhook(&body, Some(&sig)).await.unwrap();
        assert!(first.processed);

        let paid = ledger.get(purchase.id);
        assert_eq!(paid.status, FlowStatus::Paid);
        let token = paid.access_token.clone().unwrap();
        assert_eq!(token.len(), 64);

        let second = svc.handle_webhook(&body, Some(&sig)).await.unwrap();
        assert!(!second.processed);

        // One transition, one mint, one delivery overall.
        assert_eq!(ledger.paid_cas_wins(), 1);
        assert_eq!(ledger.get(purchase.id).access_token.unwrap(), token);
        assert_eq!(notifier.deliveries.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_reaches_buyer_chat_with_access_token_link() {
        let ledger = FakeLedger::default();
        let payments = FakePayments::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let purchase = ledger.seed_pending(1990);
        let svc = service(ledger.clone(), payments, notifier.clone());

        let (body, sig) = signed(&paid_event(&purchase, "pix-2"));
        svc.handle_webhook(&body, Some(&sig)).await.unwrap();

        let deliveries = notifier.deliveries.lock().unwrap();
        let delivery = deliveries.first().unwrap();
        assert_eq!(delivery.chat_id, Some(777));
        assert_eq!(delivery.content_title, "Blade Runner");

        // The deep link carries the minted access token, not the purchase
        // token.
        let access_token = ledger.get(purchase.id).access_token.unwrap();
        assert_eq!(
            delivery.deep_link.as_deref(),
            Some(format!("https://t.me/cinevision_bot?start={}", access_token).as_str())
        );
    }

    #[tokio::test]
    async fn test_refund_revokes_access_and_records_detail() {
        let ledger = FakeLedger::default();
        let payments = FakePayments::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let purchase = ledger.seed_pending(1990);
        let svc = service(ledger.clone(), payments.clone(), notifier);

        let (body, sig) = signed(&paid_event(&purchase, "pix-3"));
        svc.handle_webhook(&body, Some(&sig)).await.unwrap();
        assert!(ledger.get(purchase.id).access_token.is_some());

        let refund = serde_json::json!({
            "purchase_token": purchase.purchase_token,
            "provider": "pix",
            "provider_payment_id": "pix-3",
            "status": "refunded",
            "amount_cents": purchase.amount_cents,
            "currency": purchase.currency,
            "timestamp": Utc::now().timestamp(),
            "refund_id": "rf-9",
            "refund_amount_cents": 1990,
            "refund_reason": "buyer request"
        });
        let (body, sig) = signed(&refund);
        let response = svc.handle_webhook(&body, Some(&sig)).await.unwrap();
        assert!(response.processed);

        // The grant lives exactly as long as the paid status.
        let refunded = ledger.get(purchase.id);
        assert_eq!(refunded.status, FlowStatus::Refunded);
        assert!(refunded.access_token.is_none());

        let payment = payments.get(PaymentProvider::Pix, "pix-3");
        assert_eq!(payment.status, FlowStatus::Refunded);
        assert_eq!(payment.refund_id.as_deref(), Some("rf-9"));
        assert_eq!(payment.refund_amount_cents, Some(1990));
        assert_eq!(payment.refund_reason.as_deref(), Some("buyer request"));
        assert!(payment.refunded_at.is_some());
    }

    #[tokio::test]
    async fn test_amount_mismatch_rejected_before_any_transition() {
        let ledger = FakeLedger::default();
        let payments = FakePayments::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let purchase = ledger.seed_pending(1990);
        let svc = service(ledger.clone(), payments, notifier.clone());

        let mut event = paid_event(&purchase, "pix-4");
        event["amount_cents"] = serde_json::json!(1);
        let (body, sig) = signed(&event);

        let err = svc.handle_webhook(&body, Some(&sig)).await.unwrap_err();
        assert!(matches!(err, AppError::AmountMismatch { .. }));
        assert_eq!(ledger.get(purchase.id).status, FlowStatus::Pending);
        assert!(notifier.deliveries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_refund_acknowledged_without_transition() {
        let ledger = FakeLedger::default();
        let payments = FakePayments::default();
        let notifier = Arc::new(RecordingNotifier::default());
        let purchase = ledger.seed_pending(1990);
        let svc = service(ledger.clone(), payments, notifier);

        // Refund arrives while the purchase is still pending.
        let event = serde_json::json!({
            "purchase_token": purchase.purchase_token,
            "provider": "pix",
            "provider_payment_id": "pix-5",
            "status": "refunded",
            "amount_cents": purchase.amount_cents,
            "currency": purchase.currency,
            "timestamp": Utc::now().timestamp(),
        });
        let (body, sig) = signed(&event);

        let response = svc.handle_webhook(&body, Some(&sig)).await.unwrap();
        assert!(!response.processed);
        assert_eq!(ledger.get(purchase.id).status, FlowStatus::Pending);
    }
}
