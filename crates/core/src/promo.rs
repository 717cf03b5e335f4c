//! Promo codes, influencer campaigns, and the applied-code union.
//!
//! Codes live in two directories (generic promo codes and influencer
//! campaigns) whose namespaces are disjoint: a normalized code may exist in
//! at most one of them. Resolution happens once at checkout-validation time
//! and the result is carried through the flow as an [`AppliedCode`], so the
//! "which directory matched" question is never re-asked after payment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::{CampaignId, PromoCodeId, UserId};
use crate::types::status::{CampaignStatus, DiscountType};

/// Why a code cannot be attached to a checkout, or why a new code cannot be
/// created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("promo code not found")]
    NotFound,
    #[error("promo code has expired")]
    Expired,
    #[error("promo code usage limit reached")]
    UsageExhausted,
    #[error("campaign is not active")]
    CampaignNotActive,
    #[error("code already exists")]
    AlreadyExists,
    #[error("invalid discount: {0}")]
    InvalidDiscount(String),
}

/// Normalize a code for storage and comparison: trimmed and uppercased.
///
/// Both directories store normalized codes, which is what makes the joint
/// uniqueness check a plain equality lookup.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validate discount parameters before a promo code is created.
///
/// # Errors
///
/// Returns [`CodeError::InvalidDiscount`] if the value is negative, or is a
/// percentage above 100.
pub fn validate_discount(discount_type: DiscountType, value: Decimal) -> Result<(), CodeError> {
    if value < Decimal::ZERO {
        return Err(CodeError::InvalidDiscount(
            "discount value must not be negative".to_owned(),
        ));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::from(100) {
        return Err(CodeError::InvalidDiscount(
            "percentage discount cannot exceed 100".to_owned(),
        ));
    }
    Ok(())
}

/// A generic discount code managed by marketing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: PromoCodeId,
    /// Normalized (uppercase) code.
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// Monotonically non-decreasing; bumped only by the attribution step.
    pub times_used: i64,
    pub usage_limit: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Whether this code may be attached to a checkout at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::Expired`] past the expiry date and
    /// [`CodeError::UsageExhausted`] once the usage limit is reached.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), CodeError> {
        if let Some(expires_at) = self.expires_at
            && expires_at <= now
        {
            return Err(CodeError::Expired);
        }
        if let Some(limit) = self.usage_limit
            && self.times_used >= limit
        {
            return Err(CodeError::UsageExhausted);
        }
        Ok(())
    }

    /// Discount this code grants on a subtotal, clamped to the subtotal.
    #[must_use]
    pub fn discount_on(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => subtotal * self.discount_value / Decimal::from(100),
            DiscountType::Fixed => self.discount_value,
        };
        raw.min(subtotal).max(Decimal::ZERO)
    }
}

/// An influencer marketing campaign with its own redemption code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluencerCampaign {
    pub id: CampaignId,
    pub influencer_id: UserId,
    pub influencer_name: String,
    /// Normalized (uppercase) code, unique across both directories.
    pub promo_code: String,
    /// Percentage of attributed revenue owed to the influencer, 0-100.
    pub commission_rate: Decimal,
    pub status: CampaignStatus,
    pub times_used: i64,
    /// Sum of subtotals of orders attributed to this campaign.
    pub revenue_generated: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InfluencerCampaign {
    /// Whether the campaign code may be attached to a checkout.
    ///
    /// Only `active` campaigns redeem; pending campaigns have not been
    /// accepted by the influencer yet and archived ones are over.
    ///
    /// # Errors
    ///
    /// Returns [`CodeError::CampaignNotActive`] otherwise.
    pub fn check_redeemable(&self) -> Result<(), CodeError> {
        if self.status == CampaignStatus::Active {
            Ok(())
        } else {
            Err(CodeError::CampaignNotActive)
        }
    }

    /// Commission currently owed to the influencer.
    ///
    /// Derived on read from the live commission rate; it is deliberately
    /// never persisted, and editing the rate changes what historical revenue
    /// displays as owed.
    #[must_use]
    pub fn commission_owed(&self) -> Decimal {
        self.revenue_generated * self.commission_rate / Decimal::from(100)
    }
}

/// A code resolved once at validation time, carried immutably through
/// checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedCode {
    Promo(PromoCode),
    Campaign(InfluencerCampaign),
}

impl AppliedCode {
    /// The normalized code string.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Promo(promo) => &promo.code,
            Self::Campaign(campaign) => &campaign.promo_code,
        }
    }

    /// Discount granted on a subtotal. Campaign codes attribute revenue but
    /// grant no discount of their own.
    #[must_use]
    pub fn discount_on(&self, subtotal: Decimal) -> Decimal {
        match self {
            Self::Promo(promo) => promo.discount_on(subtotal),
            Self::Campaign(_) => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Duration;

    use super::*;

    fn promo(value: &str, discount_type: DiscountType) -> PromoCode {
        PromoCode {
            id: PromoCodeId::new(1),
            code: "SUMMER10".to_owned(),
            discount_type,
            discount_value: Decimal::from_str(value).unwrap(),
            times_used: 0,
            usage_limit: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    fn campaign(rate: &str, revenue: &str, status: CampaignStatus) -> InfluencerCampaign {
        InfluencerCampaign {
            id: CampaignId::new(1),
            influencer_id: UserId::new(9),
            influencer_name: "Wanjiku".to_owned(),
            promo_code: "LUNA20".to_owned(),
            commission_rate: Decimal::from_str(rate).unwrap(),
            status,
            times_used: 0,
            revenue_generated: Decimal::from_str(revenue).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  summer10 "), "SUMMER10");
        assert_eq!(normalize_code("Luna20"), "LUNA20");
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(DiscountType::Percentage, Decimal::from(10)).is_ok());
        assert!(validate_discount(DiscountType::Fixed, Decimal::from(500)).is_ok());
        assert!(validate_discount(DiscountType::Percentage, Decimal::from(101)).is_err());
        assert!(validate_discount(DiscountType::Fixed, Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_check_usable_fresh_code() {
        let code = promo("10", DiscountType::Percentage);
        assert!(code.check_usable(Utc::now()).is_ok());
    }

    #[test]
    fn test_check_usable_expired() {
        let mut code = promo("10", DiscountType::Percentage);
        code.expires_at = Some(Utc::now() - Duration::hours(1));
        assert_eq!(code.check_usable(Utc::now()), Err(CodeError::Expired));
    }

    #[test]
    fn test_check_usable_limit_reached() {
        let mut code = promo("10", DiscountType::Percentage);
        code.usage_limit = Some(2);

        code.times_used = 1;
        assert!(code.check_usable(Utc::now()).is_ok());

        code.times_used = 2;
        assert_eq!(
            code.check_usable(Utc::now()),
            Err(CodeError::UsageExhausted)
        );
    }

    #[test]
    fn test_percentage_discount() {
        let code = promo("10", DiscountType::Percentage);
        assert_eq!(
            code.discount_on(Decimal::from(2500)),
            Decimal::from(250)
        );
    }

    #[test]
    fn test_fixed_discount_clamped_at_subtotal() {
        let code = promo("500", DiscountType::Fixed);
        assert_eq!(code.discount_on(Decimal::from(300)), Decimal::from(300));
        assert_eq!(code.discount_on(Decimal::from(800)), Decimal::from(500));
    }

    #[test]
    fn test_campaign_redeemable_only_when_active() {
        assert!(
            campaign("10", "0", CampaignStatus::Active)
                .check_redeemable()
                .is_ok()
        );
        assert_eq!(
            campaign("10", "0", CampaignStatus::Pending).check_redeemable(),
            Err(CodeError::CampaignNotActive)
        );
        assert_eq!(
            campaign("10", "0", CampaignStatus::Archived).check_redeemable(),
            Err(CodeError::CampaignNotActive)
        );
    }

    #[test]
    fn test_commission_follows_live_rate() {
        let mut c = campaign("10", "1000", CampaignStatus::Active);
        assert_eq!(c.commission_owed(), Decimal::from(100));

        // Editing the rate retroactively changes what displays as owed for
        // revenue that already accrued. Current behavior, no per-order
        // rate snapshot exists.
        c.commission_rate = Decimal::from(20);
        assert_eq!(c.commission_owed(), Decimal::from(200));
    }

    #[test]
    fn test_applied_campaign_grants_no_discount() {
        let applied = AppliedCode::Campaign(campaign("10", "0", CampaignStatus::Active));
        assert_eq!(applied.discount_on(Decimal::from(1000)), Decimal::ZERO);
        assert_eq!(applied.code(), "LUNA20");
    }

    #[test]
    fn test_applied_promo_discount_and_code() {
        let applied = AppliedCode::Promo(promo("10", DiscountType::Percentage));
        assert_eq!(applied.discount_on(Decimal::from(1000)), Decimal::from(100));
        assert_eq!(applied.code(), "SUMMER10");
    }
}
