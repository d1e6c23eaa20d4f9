use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How a language track relates to the original audio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LanguageType {
    Original,
    Dubbed,
    Subtitled,
}

impl LanguageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageType::Original => "original",
            LanguageType::Dubbed => "dubbed",
            LanguageType::Subtitled => "subtitled",
        }
    }
}

impl std::fmt::Display for LanguageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LanguageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(LanguageType::Original),
            "dubbed" => Ok(LanguageType::Dubbed),
            "subtitled" => Ok(LanguageType::Subtitled),
            _ => Err(anyhow::anyhow!("Invalid language type: {}", s)),
        }
    }
}

/// The catalog fields the purchase flow needs: identity and price.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContentSummary {
    pub id: Uuid,
    pub title: String,
    /// Catalog price in the smallest currency unit.
    pub price_cents: i64,
    pub currency: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ContentSummary {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(ContentSummary {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            price_cents: row.try_get("price_cents")?,
            currency: row.try_get("currency")?,
            published: row.try_get("published")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// One language/dub variant of a content item. The uploaded video object
/// hangs off this row, not off the content itself.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContentLanguage {
    pub id: Uuid,
    pub content_id: Uuid,
    /// ISO 639-1 code, e.g. "en", "fa".
    pub language_code: String,
    pub language_type: LanguageType,
    /// At most one variant per content is the default; the one served when
    /// the buyer does not pick.
    pub is_default: bool,
    /// Storage key of the uploaded video, set once an upload completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ContentLanguage {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let language_type: String = row.try_get("language_type")?;
        Ok(ContentLanguage {
            id: row.try_get("id")?,
            content_id: row.try_get("content_id")?,
            language_code: row.try_get("language_code")?,
            language_type: language_type.parse().map_err(|e: anyhow::Error| {
                sqlx::Error::ColumnDecode {
                    index: "language_type".to_string(),
                    source: e.into(),
                }
            })?,
            is_default: row.try_get("is_default")?,
            storage_key: row.try_get("storage_key")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
