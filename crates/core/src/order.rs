//! Orders and the status transition planner.
//!
//! Status changes are planned as a pure step that yields the new persisted
//! state plus the side effects it triggers, and executed by the caller. That
//! keeps the state machine unit-testable without a mail server or database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::email::Email;
use crate::types::id::{OrderId, ProductId, UserId};
use crate::types::status::OrderStatus;

/// One denormalized order line, captured at purchase time.
///
/// Product name, size, and price are snapshotted into the order so later
/// catalog edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl OrderLine {
    /// Line total: unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A placed order. Never deleted; mutated only by status transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Absent for guest checkouts.
    pub user_id: Option<UserId>,
    pub user_name: String,
    pub user_email: Email,
    pub lines: Vec<OrderLine>,
    /// Σ(unit price × quantity) at creation time.
    pub subtotal: Decimal,
    /// Normalized code attached at checkout, if any.
    pub applied_code: Option<String>,
    pub discount_amount: Decimal,
    /// Amount actually charged: subtotal − discount.
    pub total: Decimal,
    /// Payment-gateway idempotency token. Unique; a duplicate reference is a
    /// replayed callback, never a second order.
    pub reference: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

/// Payload for order creation, assembled by the checkout orchestrator after
/// payment verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: Option<UserId>,
    pub user_name: String,
    pub user_email: Email,
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub applied_code: Option<String>,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub reference: String,
}

impl NewOrder {
    /// Whether the subtotal matches the sum over the lines.
    #[must_use]
    pub fn subtotal_consistent(&self) -> bool {
        self.subtotal == self.lines.iter().map(OrderLine::line_total).sum()
    }
}

/// Side effect owed after a status transition is persisted.
///
/// Effects are best-effort: a failed notification is logged, never rolled
/// into the transition result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEffect {
    /// Email the customer that the order shipped, with the tracking number.
    NotifyShipped { tracking_number: String },
}

/// Result of planning a status transition: what to persist and what to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub effects: Vec<OrderEffect>,
}

/// Why a requested status transition was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move an order from {from} to {to}")]
    Invalid { from: OrderStatus, to: OrderStatus },
    #[error("a tracking number is required to mark an order shipped")]
    MissingTrackingNumber,
}

/// Plan a status transition for an order currently in `current`.
///
/// Re-requesting the current status is an idempotent no-op: the plan keeps
/// the status and carries zero effects, so a double-submitted "shipped"
/// never emails the customer twice. A transition *into* `Shipped` requires
/// a tracking number and is the only transition with a notification effect.
///
/// # Errors
///
/// Returns [`TransitionError::Invalid`] for transitions outside the graph
/// on [`OrderStatus`], and [`TransitionError::MissingTrackingNumber`] when
/// shipping without a tracking number.
pub fn plan_transition(
    current: OrderStatus,
    requested: OrderStatus,
    tracking_number: Option<String>,
) -> Result<TransitionPlan, TransitionError> {
    if requested == current {
        return Ok(TransitionPlan {
            status: current,
            tracking_number,
            effects: Vec::new(),
        });
    }

    if !current.can_transition_to(requested) {
        return Err(TransitionError::Invalid {
            from: current,
            to: requested,
        });
    }

    if requested == OrderStatus::Shipped {
        let tracking = tracking_number
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .ok_or(TransitionError::MissingTrackingNumber)?;

        return Ok(TransitionPlan {
            status: OrderStatus::Shipped,
            tracking_number: Some(tracking.clone()),
            effects: vec![OrderEffect::NotifyShipped {
                tracking_number: tracking,
            }],
        });
    }

    Ok(TransitionPlan {
        status: requested,
        tracking_number,
        effects: Vec::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn line(product: i64, price: &str, quantity: u32) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(product),
            product_name: format!("Product {product}"),
            size: "250ml".to_owned(),
            unit_price: Decimal::from_str(price).unwrap(),
            quantity,
            image_url: None,
        }
    }

    #[test]
    fn test_subtotal_consistency() {
        let order = NewOrder {
            user_id: Some(UserId::new(1)),
            user_name: "Amina".to_owned(),
            user_email: Email::parse("amina@example.com").unwrap(),
            lines: vec![line(1, "450", 2), line(2, "199.50", 1)],
            subtotal: Decimal::from_str("1099.50").unwrap(),
            applied_code: None,
            discount_amount: Decimal::ZERO,
            total: Decimal::from_str("1099.50").unwrap(),
            reference: "ref-1".to_owned(),
        };
        assert!(order.subtotal_consistent());

        let mut wrong = order;
        wrong.subtotal = Decimal::from(1);
        assert!(!wrong.subtotal_consistent());
    }

    #[test]
    fn test_ship_requires_tracking_number() {
        let err = plan_transition(OrderStatus::Pending, OrderStatus::Shipped, None).unwrap_err();
        assert_eq!(err, TransitionError::MissingTrackingNumber);

        let err = plan_transition(
            OrderStatus::Pending,
            OrderStatus::Shipped,
            Some("   ".to_owned()),
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::MissingTrackingNumber);
    }

    #[test]
    fn test_ship_plans_exactly_one_notification() {
        let plan = plan_transition(
            OrderStatus::Pending,
            OrderStatus::Shipped,
            Some("KE123".to_owned()),
        )
        .unwrap();

        assert_eq!(plan.status, OrderStatus::Shipped);
        assert_eq!(plan.tracking_number.as_deref(), Some("KE123"));
        assert_eq!(
            plan.effects,
            vec![OrderEffect::NotifyShipped {
                tracking_number: "KE123".to_owned()
            }]
        );
    }

    #[test]
    fn test_reshipping_same_status_is_a_silent_noop() {
        let plan = plan_transition(
            OrderStatus::Shipped,
            OrderStatus::Shipped,
            Some("KE123".to_owned()),
        )
        .unwrap();

        assert_eq!(plan.status, OrderStatus::Shipped);
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_delivery_and_cancellation_carry_no_effects() {
        let plan =
            plan_transition(OrderStatus::Shipped, OrderStatus::Delivered, None).unwrap();
        assert_eq!(plan.status, OrderStatus::Delivered);
        assert!(plan.effects.is_empty());

        let plan =
            plan_transition(OrderStatus::Pending, OrderStatus::Cancelled, None).unwrap();
        assert_eq!(plan.status, OrderStatus::Cancelled);
        assert!(plan.effects.is_empty());
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let err =
            plan_transition(OrderStatus::Pending, OrderStatus::Delivered, None).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered
            }
        );

        let err = plan_transition(
            OrderStatus::Delivered,
            OrderStatus::Shipped,
            Some("KE123".to_owned()),
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { .. }));

        let err =
            plan_transition(OrderStatus::Cancelled, OrderStatus::Pending, None).unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { .. }));
    }
}
