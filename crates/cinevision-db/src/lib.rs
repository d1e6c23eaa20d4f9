//! CineVision database layer
//!
//! Repository implementations over PostgreSQL. Queries use dynamic SQLx so
//! the workspace builds without a live DATABASE_URL.

pub mod db;

pub use db::{
    ContentLanguageRepository, ContentRepository, NewPayment, PaymentRepository,
    PurchaseRepository, RefundDetail, VideoUploadRepository,
};
pub use db::transaction::TransactionGuard;

#[cfg(test)]
mod schema_tests {
    //! The repositories lean on constraints declared in the schema; these
    //! guards fail if the schema stops declaring them.

    const SCHEMA: &str = include_str!("../../../migrations/0001_initial_schema.sql");

    fn normalized() -> String {
        SCHEMA.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_one_default_variant_per_language_type() {
        let schema = normalized();
        assert!(schema.contains(
            "CREATE UNIQUE INDEX idx_content_languages_default \
             ON content_languages (content_id, language_type) WHERE is_default"
        ));
    }

    #[test]
    fn test_one_pending_purchase_per_buyer_and_title() {
        let schema = normalized();
        assert!(schema.contains(
            "CREATE UNIQUE INDEX idx_purchases_pending_per_buyer \
             ON purchases (content_id, COALESCE(user_id::text, guest_contact)) \
             WHERE status = 'pending'"
        ));
    }

    #[test]
    fn test_payments_carry_method_and_refund_detail() {
        let schema = normalized();
        for column in [
            "payment_method TEXT",
            "refund_id TEXT",
            "refund_amount_cents BIGINT",
            "refund_reason TEXT",
            "refunded_at TIMESTAMPTZ",
        ] {
            assert!(schema.contains(column), "payments schema lost {column}");
        }
    }

    #[test]
    fn test_upload_parts_keyed_per_part() {
        let schema = normalized();
        assert!(schema.contains("CREATE TABLE video_upload_parts"));
        assert!(schema.contains("PRIMARY KEY (upload_id, part_number)"));
    }
}
