//! Promo code administration routes.

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use luna_core::promo::{PromoCode, normalize_code, validate_discount};
use luna_core::types::status::DiscountType;

use crate::db::PromoRepository;
use crate::db::promos::NewPromoCode;
use crate::error::{AppError, FieldError, Result};
use crate::middleware::RequireMarketer;
use crate::state::AppState;

/// All promo codes, newest first.
#[instrument(skip(state, _auth))]
pub async fn list(
    State(state): State<AppState>,
    _auth: RequireMarketer,
) -> Result<Json<Vec<PromoCode>>> {
    let codes = PromoRepository::new(state.pool()).list().await?;
    Ok(Json(codes))
}

/// New promo code input.
#[derive(Debug, Deserialize)]
pub struct CreatePromoInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub usage_limit: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Create a promo code.
///
/// The code is uppercase-normalized; a code that already exists in either
/// the promo or the campaign directory is a conflict.
#[instrument(skip(state, _auth, input))]
pub async fn create(
    State(state): State<AppState>,
    _auth: RequireMarketer,
    Json(input): Json<CreatePromoInput>,
) -> Result<Json<PromoCode>> {
    let normalized = normalize_code(&input.code);
    let mut errors = Vec::new();

    if normalized.is_empty() {
        errors.push(FieldError::new("code", "is required"));
    }
    if let Err(e) = validate_discount(input.discount_type, input.discount_value) {
        errors.push(FieldError::new("discount_value", e.to_string()));
    }
    if input.usage_limit.is_some_and(|limit| limit <= 0) {
        errors.push(FieldError::new("usage_limit", "must be positive"));
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let created = PromoRepository::new(state.pool())
        .create(&NewPromoCode {
            code: normalized,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            usage_limit: input.usage_limit,
            expires_at: input.expires_at,
        })
        .await?;

    tracing::info!(code = %created.code, "Promo code created");

    Ok(Json(created))
}
