use chrono::{DateTime, Utc};
use cinevision_core::models::{DeliveryChannel, FlowStatus, Identity, Purchase};
use cinevision_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Partial unique index guarding one pending purchase per buyer and title.
const PENDING_PER_BUYER_INDEX: &str = "idx_purchases_pending_per_buyer";

/// Repository for the purchase ledger.
///
/// Status transitions are row-level compare-and-set: the UPDATE carries the
/// expected current status in its WHERE clause and RETURNING tells us whether
/// the edge was taken. Concurrent writers race on the row, not on a lock.
#[derive(Clone)]
pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert a pending purchase. Fails with `DuplicatePendingPurchase` if
    /// the same buyer already has an open purchase for this title. The check
    /// is the partial unique index itself, so concurrent inserts cannot both
    /// slip past it.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        content_id: Uuid,
        content_language_id: Uuid,
        identity: &Identity,
        delivery_channel: DeliveryChannel,
        amount_cents: i64,
        currency: &str,
    ) -> Result<Purchase, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (
                id, purchase_token, content_id, content_language_id,
                user_id, guest_contact, delivery_channel,
                amount_cents, currency, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Uuid::new_v4())
        .bind(content_id)
        .bind(content_language_id)
        .bind(identity.user_id())
        .bind(identity.guest_contact())
        .bind(delivery_channel.as_str())
        .bind(amount_cents)
        .bind(currency)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db)
                if db.constraint() == Some(PENDING_PER_BUYER_INDEX) =>
            {
                AppError::DuplicatePendingPurchase
            }
            _ => AppError::from(e),
        })?;

        Ok(purchase)
    }

    pub async fn find_by_token(&self, purchase_token: Uuid) -> Result<Option<Purchase>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE purchase_token = $1",
        )
        .bind(purchase_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Purchase>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    /// CAS `pending -> paid`, minting the access grant in the same statement.
    /// Returns `None` when the row was not pending; the caller re-reads and
    /// decides between idempotent success and an illegal transition.
    pub async fn mark_paid(
        &self,
        id: Uuid,
        access_token: &str,
        access_expires_at: DateTime<Utc>,
    ) -> Result<Option<Purchase>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases
            SET status = 'paid', access_token = $2, access_expires_at = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(access_token)
        .bind(access_expires_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// CAS `pending -> failed` or `pending -> cancelled`.
    pub async fn mark_closed(
        &self,
        id: Uuid,
        to: FlowStatus,
    ) -> Result<Option<Purchase>, AppError> {
        if !FlowStatus::Pending.can_transition(to) || to == FlowStatus::Paid {
            return Err(AppError::IllegalStateTransition {
                entity: "purchase",
                id: id.to_string(),
                from: FlowStatus::Pending.to_string(),
                to: to.to_string(),
            });
        }

        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// CAS `paid -> refunded`, revoking the access grant.
    pub async fn mark_refunded(&self, id: Uuid) -> Result<Option<Purchase>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            UPDATE purchases
            SET status = 'refunded', access_token = NULL, access_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'paid'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// Close out pending purchases older than the TTL. Returns how many rows
    /// were expired.
    pub async fn expire_stale_pending(&self, ttl_secs: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET status = 'failed', updated_at = NOW()
            WHERE status = 'pending' AND created_at < NOW() - ($1 * INTERVAL '1 second')
            "#,
        )
        .bind(ttl_secs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Null out access tokens past their expiry. The purchase stays paid;
    /// only the grant dies.
    pub async fn clear_expired_tokens(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET access_token = NULL, access_expires_at = NULL, updated_at = NOW()
            WHERE status = 'paid' AND access_token IS NOT NULL AND access_expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Look up a paid purchase by its live access token.
    pub async fn find_by_access_token(&self, token: &str) -> Result<Option<Purchase>, AppError> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT * FROM purchases
            WHERE access_token = $1 AND status = 'paid' AND access_expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }
}
