//! Order history routes for logged-in shoppers.

use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use luna_core::Order;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::db::OrderRepository;
use crate::state::AppState;

/// List the current shopper's orders, newest first.
#[instrument(skip(state, auth))]
pub async fn list(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let RequireAuth(user) = auth;
    let orders = OrderRepository::new(state.pool())
        .get_by_user(user.id)
        .await?;

    Ok(Json(orders))
}

/// Show one of the current shopper's orders by payment reference.
///
/// Another shopper's reference 404s rather than 403s, so references stay
/// unguessable.
#[instrument(skip(state, auth))]
pub async fn detail(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(reference): Path<String>,
) -> Result<Json<Order>> {
    let RequireAuth(user) = auth;
    let order = OrderRepository::new(state.pool())
        .get_by_reference(&reference)
        .await?
        .filter(|order| order.user_id == Some(user.id))
        .ok_or_else(|| AppError::NotFound("order".to_owned()))?;

    Ok(Json(order))
}
