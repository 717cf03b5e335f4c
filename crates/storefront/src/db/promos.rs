//! Promo/campaign directory access for checkout and attribution.
//!
//! Resolution returns the raw entity; usability judgments (`check_usable`,
//! `check_redeemable`) are made by the caller with the pure rules in
//! `luna_core::promo`, so they stay testable without a database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use luna_core::promo::{AppliedCode, InfluencerCampaign, PromoCode, normalize_code};
use luna_core::types::id::{CampaignId, PromoCodeId, UserId};
use luna_core::types::status::{CampaignStatus, DiscountType};

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
        let discount_type: DiscountType = self.discount_type.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid discount type: {e}"))
        })?;

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

#[derive(sqlx::FromRow)]
pub(crate) struct CampaignRow {
    pub id: i64,
    pub influencer_id: i64,
    pub influencer_name: String,
    pub promo_code: String,
    pub commission_rate: Decimal,
    pub status: String,
    pub times_used: i64,
    pub revenue_generated: Decimal,
    pub created_at: DateTime<Utc>,
}

impl CampaignRow {
    pub(crate) fn into_campaign(self) -> Result<InfluencerCampaign, RepositoryError> {
        let status: CampaignStatus = self.status.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid campaign status: {e}"))
        })?;

        Ok(InfluencerCampaign {
            id: CampaignId::new(self.id),
            influencer_id: UserId::new(self.influencer_id),
            influencer_name: self.influencer_name,
            promo_code: self.promo_code,
            commission_rate: self.commission_rate,
            status,
            times_used: self.times_used,
            revenue_generated: self.revenue_generated,
            created_at: self.created_at,
        })
    }
}

pub(crate) const PROMO_COLUMNS: &str =
    "id, code, discount_type, discount_value, times_used, usage_limit, expires_at, created_at";

pub(crate) const CAMPAIGN_COLUMNS: &str = "id, influencer_id, influencer_name, promo_code, \
     commission_rate, status, times_used, revenue_generated, created_at";

/// Read/attribution access to the promo code and campaign directories.
pub struct PromoDirectory<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoDirectory<'a> {
    /// Create a new directory handle.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a code against both directories, promo codes first.
    ///
    /// The namespaces are disjoint by the joint-uniqueness invariant, so at
    /// most one directory matches. The returned entity carries no usability
    /// judgment; callers validate with the core rules before attaching it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_code(&self, code: &str) -> Result<Option<AppliedCode>, RepositoryError> {
        let normalized = normalize_code(code);

        let promo_query = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = $1");
        let row = sqlx::query_as::<_, PromoCodeRow>(&promo_query)
            .bind(&normalized)
            .fetch_optional(self.pool)
            .await?;

        if let Some(row) = row {
            return Ok(Some(AppliedCode::Promo(row.into_promo_code()?)));
        }

        let campaign_query = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE promo_code = $1");
        let row = sqlx::query_as::<_, CampaignRow>(&campaign_query)
            .bind(&normalized)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(AppliedCode::Campaign(row.into_campaign()?))),
            None => Ok(None),
        }
    }

    /// Record a redemption against the directory the code came from.
    ///
    /// Counter updates are single atomic statements, never read-modify-write:
    /// two simultaneous redemptions of the same code both land. The promo
    /// increment is guarded so `times_used` can never pass `usage_limit`
    /// even if a race slipped past checkout validation; a guard miss is
    /// logged and swallowed because the order itself already exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_redemption(
        &self,
        applied: &AppliedCode,
        order_subtotal: Decimal,
    ) -> Result<(), RepositoryError> {
        match applied {
            AppliedCode::Promo(promo) => {
                let result = sqlx::query(
                    "UPDATE promo_codes \
                     SET times_used = times_used + 1 \
                     WHERE id = $1 \
                       AND (usage_limit IS NULL OR times_used < usage_limit)",
                )
                .bind(promo.id.as_i64())
                .execute(self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    tracing::warn!(
                        code = %promo.code,
                        "Promo redemption hit exhausted usage limit after payment; not counted"
                    );
                }
            }
            AppliedCode::Campaign(campaign) => {
                sqlx::query(
                    "UPDATE campaigns \
                     SET times_used = times_used + 1, \
                         revenue_generated = revenue_generated + $2 \
                     WHERE id = $1",
                )
                .bind(campaign.id.as_i64())
                .bind(order_subtotal)
                .execute(self.pool)
                .await?;
            }
        }

        Ok(())
    }
}
