use cinevision_core::models::{FlowStatus, Payment, PaymentProvider, ProviderMeta};
use cinevision_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// One provider event as it arrives, before any row exists for it.
#[derive(Debug, Clone)]
pub struct NewPayment<'a> {
    pub purchase_id: Uuid,
    pub provider: PaymentProvider,
    pub provider_payment_id: &'a str,
    pub amount_cents: i64,
    pub currency: &'a str,
    pub status: FlowStatus,
    pub payment_method: Option<&'a str>,
    pub meta: Option<&'a ProviderMeta>,
    pub failure_reason: Option<&'a str>,
    pub refund: RefundDetail<'a>,
}

/// Refund fields a provider reports on `refunded` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefundDetail<'a> {
    pub refund_id: Option<&'a str>,
    pub refund_amount_cents: Option<i64>,
    pub refund_reason: Option<&'a str>,
}

/// Repository for payment records reported by providers.
///
/// Rows are keyed by `(provider, provider_payment_id)` so a redelivered
/// webhook lands on the row it created the first time.
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the payment if this provider event is new; otherwise return
    /// the existing row untouched.
    pub async fn upsert(&self, new: NewPayment<'_>) -> Result<Payment, AppError> {
        let meta_json = new.meta.map(serde_json::to_value).transpose()?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                id, purchase_id, provider, provider_payment_id,
                amount_cents, currency, status, payment_method, meta,
                failure_reason, refund_id, refund_amount_cents, refund_reason,
                refunded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    CASE WHEN $7 = 'refunded' THEN NOW() END)
            ON CONFLICT (provider, provider_payment_id) DO UPDATE
                SET updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.purchase_id)
        .bind(new.provider.as_str())
        .bind(new.provider_payment_id)
        .bind(new.amount_cents)
        .bind(new.currency)
        .bind(new.status.as_str())
        .bind(new.payment_method)
        .bind(meta_json)
        .bind(new.failure_reason)
        .bind(new.refund.refund_id)
        .bind(new.refund.refund_amount_cents)
        .bind(new.refund.refund_reason)
        .fetch_one(&self.pool)
        .await?;

        Ok(payment)
    }

    /// CAS a payment forward along the state machine. Returns `None` when the
    /// row was not in `from` anymore. Refund detail is written only when the
    /// target status is `refunded`.
    pub async fn transition(
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

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $3,
                failure_reason = COALESCE($4, failure_reason),
                refund_id = CASE WHEN $3 = 'refunded' THEN $5 ELSE refund_id END,
                refund_amount_cents = CASE WHEN $3 = 'refunded' THEN $6 ELSE refund_amount_cents END,
                refund_reason = CASE WHEN $3 = 'refunded' THEN $7 ELSE refund_reason END,
                refunded_at = CASE WHEN $3 = 'refunded' THEN NOW() ELSE refunded_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(failure_reason)
        .bind(refund.refund_id)
        .bind(refund.refund_amount_cents)
        .bind(refund.refund_reason)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn find_by_provider_id(
        &self,
        provider: PaymentProvider,
        provider_payment_id: &str,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE provider = $1 AND provider_payment_id = $2",
        )
        .bind(provider.as_str())
        .bind(provider_payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn list_for_purchase(&self, purchase_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE purchase_id = $1 ORDER BY created_at",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}
