//! Order management routes.
//!
//! Status changes run through the pure transition planner: the route
//! validates nothing itself beyond parsing, asks the planner what to
//! persist and what to send, writes the plan, then executes its effects
//! best-effort.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::instrument;

use luna_core::{Order, OrderEffect, OrderId, OrderStatus, plan_transition};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireOrderManager;
use crate::services::mailer::fire_and_forget;
use crate::state::AppState;

/// All orders, newest first.
#[instrument(skip(state, _auth))]
pub async fn list(
    State(state): State<AppState>,
    _auth: RequireOrderManager,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool()).list_all().await?;
    Ok(Json(orders))
}

/// One order by id.
#[instrument(skip(state, _auth))]
pub async fn detail(
    State(state): State<AppState>,
    _auth: RequireOrderManager,
    Path(id): Path<i64>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get_by_id(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_owned()))?;

    Ok(Json(order))
}

/// Status update input.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusInput {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

/// Move an order to a new status.
///
/// Same-status requests are accepted and change nothing (in particular,
/// they never re-send the shipped notification). Transitions outside the
/// graph and shipping without a tracking number are rejected before any
/// write.
#[instrument(skip(state, auth, input), fields(order_id = id))]
pub async fn update_status(
    State(state): State<AppState>,
    auth: RequireOrderManager,
    Path(id): Path<i64>,
    Json(input): Json<UpdateStatusInput>,
) -> Result<Json<Order>> {
    let RequireOrderManager(operator) = auth;
    let repo = OrderRepository::new(state.pool());

    let order = repo
        .get_by_id(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_owned()))?;

    let plan = plan_transition(order.status, input.status, input.tracking_number)?;

    let updated = repo.apply_transition(order.id, order.status, &plan).await?;

    tracing::info!(
        order_id = %updated.id,
        from = %order.status,
        to = %updated.status,
        operator = %operator.email,
        "Order status updated"
    );

    for effect in plan.effects {
        match effect {
            OrderEffect::NotifyShipped { tracking_number } => {
                let mailer = state.mailer().clone();
                let order = updated.clone();
                fire_and_forget("order shipped", async move {
                    mailer.send_order_shipped(&order, &tracking_number).await
                });
            }
        }
    }

    Ok(Json(updated))
}
