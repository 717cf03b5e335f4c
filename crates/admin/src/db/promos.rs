//! Promo code administration.
//!
//! Codes are uppercase-normalized before storage. Uniqueness is enforced
//! jointly with the campaigns table: a code that exists in either directory
//! cannot be created in the other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use luna_core::promo::{PromoCode, normalize_code};
use luna_core::types::id::PromoCodeId;
use luna_core::types::status::DiscountType;

use super::RepositoryError;

#[derive(sqlx::FromRow)]
pub(crate) struct PromoCodeRow {
    pub id: i64,
    pub code: String,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub times_used: i64,
    pub usage_limit: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PromoCodeRow {
    pub(crate) fn into_promo_code(self) -> Result<PromoCode, RepositoryError> {
        let discount_type: DiscountType = self
            .discount_type
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid discount type: {e}")))?;

        Ok(PromoCode {
            id: PromoCodeId::new(self.id),
            code: self.code,
            discount_type,
            discount_value: self.discount_value,
            times_used: self.times_used,
            usage_limit: self.usage_limit,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

pub(crate) const PROMO_COLUMNS: &str =
    "id, code, discount_type, discount_value, times_used, usage_limit, expires_at, created_at";

/// Whether a normalized code exists in either directory.
///
/// The pre-insert check gives a clean conflict message; the unique indexes
/// backstop it against races.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub(crate) async fn code_exists(pool: &PgPool, normalized: &str) -> Result<bool, RepositoryError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM promo_codes WHERE code = $1) \
             OR EXISTS (SELECT 1 FROM campaigns WHERE promo_code = $1)",
    )
    .bind(normalized)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// New promo code payload, validated by the route before it gets here.
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub usage_limit: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Repository for promo code administration.
pub struct PromoRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoRepository<'a> {
    /// Create a new promo repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All promo codes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<PromoCode>, RepositoryError> {
        let query = format!("SELECT {PROMO_COLUMNS} FROM promo_codes ORDER BY created_at DESC");

        let rows = sqlx::query_as::<_, PromoCodeRow>(&query)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(PromoCodeRow::into_promo_code).collect()
    }

    /// Create a promo code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the normalized code already
    /// exists in either directory, `RepositoryError::Database` otherwise.
    pub async fn create(&self, new_code: &NewPromoCode) -> Result<PromoCode, RepositoryError> {
        let normalized = normalize_code(&new_code.code);

        if code_exists(self.pool, &normalized).await? {
            return Err(RepositoryError::Conflict(format!(
                "code {normalized} already exists"
            )));
        }

        let query = format!(
            "INSERT INTO promo_codes (code, discount_type, discount_value, usage_limit, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PROMO_COLUMNS}"
        );

        let inserted = sqlx::query_as::<_, PromoCodeRow>(&query)
            .bind(&normalized)
            .bind(new_code.discount_type.to_string())
            .bind(new_code.discount_value)
            .bind(new_code.usage_limit)
            .bind(new_code.expires_at)
            .fetch_one(self.pool)
            .await;

        match inserted {
            Ok(row) => row.into_promo_code(),
            Err(e) => {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return Err(RepositoryError::Conflict(format!(
                        "code {normalized} already exists"
                    )));
                }
                Err(RepositoryError::Database(e))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use luna_core::types::id::UserId;

    use super::super::campaigns::{CampaignRepository, NewCampaign};
    use super::*;

    fn percentage_code(code: &str) -> NewPromoCode {
        NewPromoCode {
            code: code.to_owned(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            usage_limit: None,
            expires_at: None,
        }
    }

    async fn seed_user(pool: &PgPool, email: &str) -> UserId {
        let (id,): (i64,) =
            sqlx::query_as("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id")
                .bind("Wanjiru Kamau")
                .bind(email)
                .fetch_one(pool)
                .await
                .unwrap();
        UserId::new(id)
    }

    #[sqlx::test(migrations = "../storefront/migrations")]
    async fn test_campaign_code_cannot_reuse_a_promo_code(pool: PgPool) {
        PromoRepository::new(&pool)
            .create(&percentage_code("GLOW15"))
            .await
            .unwrap();

        let influencer_id = seed_user(&pool, "wanjiru@example.com").await;
        let err = CampaignRepository::new(&pool)
            .create(&NewCampaign {
                influencer_id,
                influencer_name: "Wanjiru Kamau".to_owned(),
                promo_code: "glow15".to_owned(),
                commission_rate: Decimal::from(15),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[sqlx::test(migrations = "../storefront/migrations")]
    async fn test_promo_code_cannot_reuse_a_campaign_code(pool: PgPool) {
        let influencer_id = seed_user(&pool, "wanjiru@example.com").await;
        CampaignRepository::new(&pool)
            .create(&NewCampaign {
                influencer_id,
                influencer_name: "Wanjiru Kamau".to_owned(),
                promo_code: "WANJIRU20".to_owned(),
                commission_rate: Decimal::from(20),
            })
            .await
            .unwrap();

        let err = PromoRepository::new(&pool)
            .create(&percentage_code("wanjiru20"))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[sqlx::test(migrations = "../storefront/migrations")]
    async fn test_create_normalizes_and_rejects_duplicates(pool: PgPool) {
        let repo = PromoRepository::new(&pool);
        let created = repo.create(&percentage_code("  glow15 ")).await.unwrap();
        assert_eq!(created.code, "GLOW15");

        let err = repo.create(&percentage_code("GLOW15")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
