use cinevision_core::models::{ContentLanguage, ContentSummary, LanguageType};
use cinevision_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

use super::transaction::TransactionGuard;

/// Repository for the content catalog.
#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_summary(&self, id: Uuid) -> Result<Option<ContentSummary>, AppError> {
        let content = sqlx::query_as::<_, ContentSummary>(
            "SELECT id, title, price_cents, currency, published, created_at FROM content WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(content)
    }
}

/// Repository for language/dub variants of content.
#[derive(Clone)]
pub struct ContentLanguageRepository {
    pool: PgPool,
}

impl ContentLanguageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentLanguage>, AppError> {
        let language = sqlx::query_as::<_, ContentLanguage>(
            "SELECT * FROM content_languages WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(language)
    }

    pub async fn list_for_content(
        &self,
        content_id: Uuid,
    ) -> Result<Vec<ContentLanguage>, AppError> {
        let languages = sqlx::query_as::<_, ContentLanguage>(
            "SELECT * FROM content_languages WHERE content_id = $1 ORDER BY language_code",
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(languages)
    }

    /// Insert or reuse the variant for `(content_id, language_code)`. When
    /// `is_default` is set, sibling defaults of the same language type are
    /// cleared first in the same transaction so the partial unique index
    /// never trips.
    pub async fn upsert(
        &self,
        content_id: Uuid,
        language_code: &str,
        language_type: LanguageType,
        is_default: bool,
    ) -> Result<ContentLanguage, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        if is_default {
            sqlx::query(
                r#"
                UPDATE content_languages
                SET is_default = FALSE, updated_at = NOW()
                WHERE content_id = $1
                  AND language_type = $2
                  AND is_default = TRUE
                  AND language_code <> $3
                "#,
            )
            .bind(content_id)
            .bind(language_type.as_str())
            .bind(language_code)
            .execute(&mut **tx)
            .await?;
        }

        let language = sqlx::query_as::<_, ContentLanguage>(
            r#"
            INSERT INTO content_languages (id, content_id, language_code, language_type, is_default)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (content_id, language_code) DO UPDATE
                SET language_type = EXCLUDED.language_type,
                    is_default = content_languages.is_default OR EXCLUDED.is_default,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(content_id)
        .bind(language_code)
        .bind(language_type.as_str())
        .bind(is_default)
        .fetch_one(&mut **tx)
        .await?;

        tx.commit().await?;
        Ok(language)
    }

    /// Point the variant at its uploaded video object.
    pub async fn set_storage_key(
        &self,
        id: Uuid,
        storage_key: &str,
    ) -> Result<Option<ContentLanguage>, AppError> {
        let language = sqlx::query_as::<_, ContentLanguage>(
            r#"
            UPDATE content_languages
            SET storage_key = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(storage_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(language)
    }
}
