//! Influencer campaign routes: marketing administration plus the
//! influencer's own portal view.

use axum::Json;
use axum::extract::{Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use luna_core::promo::{InfluencerCampaign, normalize_code};
use luna_core::types::id::CampaignId;

use crate::db::campaigns::NewCampaign;
use crate::db::{CampaignRepository, UserRepository};
use crate::error::{AppError, FieldError, Result};
use crate::middleware::{RequireMarketer, RequireOperator};
use crate::services::mailer::fire_and_forget;
use crate::state::AppState;

/// A campaign with its derived commission, as shown to marketers and
/// influencers. Commission is computed from the live rate at read time;
/// nothing stores it.
#[derive(Debug, Serialize)]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: InfluencerCampaign,
    pub commission_owed: Decimal,
}

impl From<InfluencerCampaign> for CampaignView {
    fn from(campaign: InfluencerCampaign) -> Self {
        let commission_owed = campaign.commission_owed();
        Self {
            campaign,
            commission_owed,
        }
    }
}

/// All campaigns, newest first.
#[instrument(skip(state, _auth))]
pub async fn list(
    State(state): State<AppState>,
    _auth: RequireMarketer,
) -> Result<Json<Vec<CampaignView>>> {
    let campaigns = CampaignRepository::new(state.pool()).list().await?;
    Ok(Json(campaigns.into_iter().map(CampaignView::from).collect()))
}

/// The logged-in influencer's own campaigns.
#[instrument(skip(state, auth))]
pub async fn portal(
    State(state): State<AppState>,
    auth: RequireOperator,
) -> Result<Json<Vec<CampaignView>>> {
    let RequireOperator(operator) = auth;
    let campaigns = CampaignRepository::new(state.pool())
        .list_by_influencer(operator.id)
        .await?;

    Ok(Json(campaigns.into_iter().map(CampaignView::from).collect()))
}

/// New campaign input.
#[derive(Debug, Deserialize)]
pub struct CreateCampaignInput {
    /// Email of the user fronting the campaign; must already exist.
    pub influencer_email: String,
    pub promo_code: String,
    /// Percentage in [0, 100].
    pub commission_rate: Decimal,
}

/// Create a pending campaign.
///
/// Promotes the target user from customer to influencer, inserts the
/// campaign, and sends a best-effort invite. The code only becomes
/// redeemable once the influencer accepts.
#[instrument(skip(state, _auth, input))]
pub async fn create(
    State(state): State<AppState>,
    _auth: RequireMarketer,
    Json(input): Json<CreateCampaignInput>,
) -> Result<Json<CampaignView>> {
    let mut errors = Vec::new();

    let normalized = normalize_code(&input.promo_code);
    if normalized.is_empty() {
        errors.push(FieldError::new("promo_code", "is required"));
    }
    if input.commission_rate < Decimal::ZERO || input.commission_rate > Decimal::from(100) {
        errors.push(FieldError::new(
            "commission_rate",
            "must be between 0 and 100",
        ));
    }
    let email = match luna_core::Email::parse(input.influencer_email.trim()) {
        Ok(email) => Some(email),
        Err(e) => {
            errors.push(FieldError::new("influencer_email", e.to_string()));
            None
        }
    };
    let Some(email) = email else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let influencer = UserRepository::new(state.pool())
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("influencer user".to_owned()))?;

    let created = CampaignRepository::new(state.pool())
        .create(&NewCampaign {
            influencer_id: influencer.id,
            influencer_name: influencer.name,
            promo_code: normalized,
            commission_rate: input.commission_rate,
        })
        .await?;

    tracing::info!(
        campaign_id = %created.id,
        code = %created.promo_code,
        influencer = %email,
        "Campaign created"
    );

    let mailer = state.mailer().clone();
    let invite_campaign = created.clone();
    fire_and_forget("campaign invite", async move {
        mailer.send_campaign_invite(&invite_campaign, &email).await
    });

    Ok(Json(CampaignView::from(created)))
}

/// Accept a campaign, activating its code.
///
/// Only the named influencer (or a marketer acting for them) may accept.
/// Accepting an already-active campaign is a no-op success.
#[instrument(skip(state, auth))]
pub async fn accept(
    State(state): State<AppState>,
    auth: RequireOperator,
    Path(id): Path<i64>,
) -> Result<Json<CampaignView>> {
    let RequireOperator(operator) = auth;
    let repo = CampaignRepository::new(state.pool());

    let campaign = repo
        .get_by_id(CampaignId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("campaign".to_owned()))?;

    if campaign.influencer_id != operator.id && !operator.role.can_manage_marketing() {
        return Err(AppError::Forbidden(
            "only the campaign's influencer may accept it".to_owned(),
        ));
    }

    let accepted = repo.accept(campaign.id).await?;

    tracing::info!(campaign_id = %accepted.id, code = %accepted.promo_code, "Campaign accepted");

    Ok(Json(CampaignView::from(accepted)))
}

/// Archive a campaign, retiring its code.
#[instrument(skip(state, _auth))]
pub async fn archive(
    State(state): State<AppState>,
    _auth: RequireMarketer,
    Path(id): Path<i64>,
) -> Result<Json<CampaignView>> {
    let archived = CampaignRepository::new(state.pool())
        .archive(CampaignId::new(id))
        .await?;

    tracing::info!(campaign_id = %archived.id, code = %archived.promo_code, "Campaign archived");

    Ok(Json(CampaignView::from(archived)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use luna_core::types::id::UserId;
    use luna_core::types::status::CampaignStatus;

    use super::*;

    #[test]
    fn test_view_derives_commission_from_live_rate() {
        let campaign = InfluencerCampaign {
            id: CampaignId::new(1),
            influencer_id: UserId::new(7),
            influencer_name: "Wanjiku".to_owned(),
            promo_code: "LUNA20".to_owned(),
            commission_rate: Decimal::from(15),
            status: CampaignStatus::Active,
            times_used: 3,
            revenue_generated: Decimal::from(2000),
            created_at: Utc::now(),
        };

        let view = CampaignView::from(campaign);
        assert_eq!(view.commission_owed, Decimal::from(300));
    }

    #[test]
    fn test_view_serializes_flat() {
        let campaign = InfluencerCampaign {
            id: CampaignId::new(1),
            influencer_id: UserId::new(7),
            influencer_name: "Wanjiku".to_owned(),
            promo_code: "LUNA20".to_owned(),
            commission_rate: Decimal::from_str("12.5").unwrap(),
            status: CampaignStatus::Pending,
            times_used: 0,
            revenue_generated: Decimal::ZERO,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(CampaignView::from(campaign)).unwrap();
        assert_eq!(json["promo_code"], "LUNA20");
        assert_eq!(json["status"], "pending");
        assert!(json.get("commission_owed").is_some());
    }
}
