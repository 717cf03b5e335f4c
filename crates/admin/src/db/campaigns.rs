//! Influencer campaign administration.
//!
//! Campaigns are created `pending` and become `active` only when the
//! influencer accepts. Creation promotes a plain customer to the
//! influencer role in the same transaction as the campaign insert, so a
//! failure in either leaves no partial write.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use luna_core::promo::{InfluencerCampaign, normalize_code};
use luna_core::types::id::{CampaignId, UserId};
use luna_core::types::status::CampaignStatus;

use super::promos::code_exists;
use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: i64,
    influencer_id: i64,
    influencer_name: String,
    promo_code: String,
    commission_rate: Decimal,
    status: String,
    times_used: i64,
    revenue_generated: Decimal,
    created_at: DateTime<Utc>,
}

impl CampaignRow {
    fn into_campaign(self) -> Result<InfluencerCampaign, RepositoryError> {
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

const CAMPAIGN_COLUMNS: &str = "id, influencer_id, influencer_name, promo_code, \
     commission_rate, status, times_used, revenue_generated, created_at";

/// New campaign payload, validated by the route before it gets here.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub influencer_id: UserId,
    pub influencer_name: String,
    pub promo_code: String,
    /// Percentage in [0, 100].
    pub commission_rate: Decimal,
}

/// Repository for campaign administration.
pub struct CampaignRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CampaignRepository<'a> {
    /// Create a new campaign repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All campaigns, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<InfluencerCampaign>, RepositoryError> {
        let query = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC");

        let rows = sqlx::query_as::<_, CampaignRow>(&query)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(CampaignRow::into_campaign).collect()
    }

    /// Campaigns belonging to one influencer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_influencer(
        &self,
        influencer_id: UserId,
    ) -> Result<Vec<InfluencerCampaign>, RepositoryError> {
        let query = format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns \
             WHERE influencer_id = $1 ORDER BY created_at DESC"
        );

        let rows = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(influencer_id.as_i64())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(CampaignRow::into_campaign).collect()
    }

    /// Get one campaign by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: CampaignId,
    ) -> Result<Option<InfluencerCampaign>, RepositoryError> {
        let query = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1");

        let row = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        row.map(CampaignRow::into_campaign).transpose()
    }

    /// Create a pending campaign and promote its influencer.
    ///
    /// Runs in one transaction: the campaign insert and the
    /// customer-to-influencer role promotion land together or not at all.
    /// Users already holding a back-office role keep it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the normalized code already
    /// exists in either directory, `RepositoryError::Database` otherwise.
    pub async fn create(
        &self,
        new_campaign: &NewCampaign,
    ) -> Result<InfluencerCampaign, RepositoryError> {
        let normalized = normalize_code(&new_campaign.promo_code);

        if code_exists(self.pool, &normalized).await? {
            return Err(RepositoryError::Conflict(format!(
                "code {normalized} already exists"
            )));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE users SET role = 'influencer', updated_at = now() WHERE id = $1 AND role = 'customer'")
            .bind(new_campaign.influencer_id.as_i64())
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO campaigns (influencer_id, influencer_name, promo_code, commission_rate, status) \
             VALUES ($1, $2, $3, $4, 'pending') \
             RETURNING {CAMPAIGN_COLUMNS}"
        );

        let inserted = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(new_campaign.influencer_id.as_i64())
            .bind(&new_campaign.influencer_name)
            .bind(&normalized)
            .bind(new_campaign.commission_rate)
            .fetch_one(&mut *tx)
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                // Rollback happens on drop.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return Err(RepositoryError::Conflict(format!(
                        "code {normalized} already exists"
                    )));
                }
                return Err(RepositoryError::Database(e));
            }
        };

        tx.commit().await?;

        row.into_campaign()
    }

    /// Accept a pending campaign, activating its code.
    ///
    /// Idempotent on an already-active campaign; an archived campaign
    /// cannot be revived.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` for an archived campaign.
    pub async fn accept(&self, id: CampaignId) -> Result<InfluencerCampaign, RepositoryError> {
        let query = format!(
            "UPDATE campaigns SET status = 'active' \
             WHERE id = $1 AND status IN ('pending', 'active') \
             RETURNING {CAMPAIGN_COLUMNS}"
        );

        let row = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => row.into_campaign(),
            None => match self.get_by_id(id).await? {
                Some(_) => Err(RepositoryError::Conflict(
                    "campaign is archived".to_owned(),
                )),
                None => Err(RepositoryError::NotFound),
            },
        }
    }

    /// Archive a campaign, retiring its code. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn archive(&self, id: CampaignId) -> Result<InfluencerCampaign, RepositoryError> {
        let query = format!(
            "UPDATE campaigns SET status = 'archived' WHERE id = $1 RETURNING {CAMPAIGN_COLUMNS}"
        );

        let row = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        row.into_campaign()
    }
}
