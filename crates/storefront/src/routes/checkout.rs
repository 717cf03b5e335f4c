//! Checkout orchestration.
//!
//! The flow is split around the payment capability:
//!
//! 1. `POST /checkout` validates the form and cart, resolves an optional
//!    promo/campaign code exactly once, snapshots the cart into a
//!    [`PendingCheckout`] keyed by the payment reference, and initializes
//!    the payment. No order exists yet.
//! 2. The shopper pays (or abandons) on the gateway side. Abandoning is a
//!    no-op: the cart and directories are untouched.
//! 3. `GET /checkout/callback` verifies the reference and creates the order
//!    exactly once, from the snapshot taken at step 1. Past that point
//!    payment is authoritative: failures of the order write, attribution,
//!    or notifications are logged for manual reconciliation and never
//!    surfaced as a shopper-facing error.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Json, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use luna_core::promo::AppliedCode;
use luna_core::{Cart, Email, NewOrder, Order, OrderLine, minor_units};

use crate::db::{OrderRepository, PromoDirectory, UserRepository};
use crate::error::{AppError, FieldError, Result};
use crate::models::user::ShippingAddress;
use crate::models::session_keys;
use crate::routes::cart::{load_cart, save_cart};
use crate::services::mailer::fire_and_forget;
use crate::services::paystack::InitializePayment;
use crate::state::AppState;

/// Checkout form input: shopper identity plus shipping details.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub country: String,
    pub promo_code: Option<String>,
}

impl CheckoutForm {
    /// Validate the form into shipping details and a parsed email.
    ///
    /// All fields are required; failures are reported per-field and no
    /// network call is made before this passes.
    ///
    /// # Errors
    ///
    /// Returns one [`FieldError`] per offending field.
    pub fn validate(&self) -> std::result::Result<(ShippingAddress, Email), Vec<FieldError>> {
        let mut errors = Vec::new();

        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "is required"));
            }
        }

        let email = match Email::parse(self.email.trim()) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(FieldError::new("email", e.to_string()));
                None
            }
        };

        match email {
            Some(email) if errors.is_empty() => Ok((
                ShippingAddress {
                    first_name: self.first_name.trim().to_owned(),
                    last_name: self.last_name.trim().to_owned(),
                    address: self.address.trim().to_owned(),
                    city: self.city.trim().to_owned(),
                    zip_code: self.zip_code.trim().to_owned(),
                    country: self.country.trim().to_owned(),
                },
                email,
            )),
            _ => Err(errors),
        }
    }
}

/// Checkout context parked in the session while the shopper is at the
/// gateway. The applied code and the cart lines are resolved and frozen at
/// checkout start, so later cart edits in the same session cannot change
/// what the charged amount pays for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub reference: String,
    pub shipping: ShippingAddress,
    pub email: Email,
    pub applied_code: Option<AppliedCode>,
    pub cart: Cart,
}

/// Load the session's in-flight checkouts, keyed by payment reference.
///
/// A second checkout started before the first resolves must not clobber it;
/// each lives under its own reference until paid or cancelled.
async fn load_pending_checkouts(session: &Session) -> HashMap<String, PendingCheckout> {
    session
        .get::<HashMap<String, PendingCheckout>>(session_keys::PENDING_CHECKOUTS)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn save_pending_checkouts(
    session: &Session,
    pendings: &HashMap<String, PendingCheckout>,
) -> Result<()> {
    session
        .insert(session_keys::PENDING_CHECKOUTS, pendings)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist pending checkout: {e}")))
}

/// Response to a started checkout.
#[derive(Debug, Serialize)]
pub struct CheckoutStarted {
    pub authorization_url: String,
    pub reference: String,
    pub subtotal: rust_decimal::Decimal,
    pub discount_amount: rust_decimal::Decimal,
    pub total: rust_decimal::Decimal,
}

/// Confirmation returned from the payment callback.
///
/// `order` is absent only on the reconciliation path where payment
/// succeeded but the order record could not be written or located.
#[derive(Debug, Serialize)]
pub struct OrderConfirmation {
    pub reference: String,
    pub order: Option<Order>,
}

/// Start a checkout: validate, resolve the code, initialize payment.
#[instrument(skip(state, session, form))]
pub async fn start(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CheckoutForm>,
) -> Result<Response> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        // Precondition failure: nothing to check out.
        return Ok(Redirect::to("/cart").into_response());
    }

    let (shipping, email) = form.validate().map_err(AppError::Validation)?;

    // Resolve the code once, against promo codes first, and reject unusable
    // codes before any money moves.
    let applied_code = match form.promo_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let directory = PromoDirectory::new(state.pool());
            let applied = directory
                .find_code(code)
                .await?
                .ok_or(AppError::Code(luna_core::promo::CodeError::NotFound))?;

            match &applied {
                AppliedCode::Promo(promo) => promo.check_usable(Utc::now())?,
                AppliedCode::Campaign(campaign) => campaign.check_redeemable()?,
            }

            Some(applied)
        }
        _ => None,
    };

    let subtotal = cart.subtotal();
    let discount_amount = applied_code
        .as_ref()
        .map_or(rust_decimal::Decimal::ZERO, |code| {
            code.discount_on(subtotal)
        });
    let total = subtotal - discount_amount;

    let reference = Uuid::new_v4().to_string();

    let pending = PendingCheckout {
        reference: reference.clone(),
        shipping,
        email: email.clone(),
        applied_code,
        cart,
    };
    let mut pendings = load_pending_checkouts(&session).await;
    pendings.insert(reference.clone(), pending);
    save_pending_checkouts(&session, &pendings).await?;

    let init = InitializePayment {
        amount: minor_units(total),
        currency: state.config().paystack.currency.clone(),
        reference: reference.clone(),
        email: email.into_inner(),
        callback_url: format!("{}/checkout/callback", state.config().base_url),
    };
    let payment = state.paystack().initialize(&init).await?;

    Ok(Json(CheckoutStarted {
        authorization_url: payment.authorization_url,
        reference,
        subtotal,
        discount_amount,
        total,
    })
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub reference: Option<String>,
}

/// Abandon the payment dialog.
///
/// Deliberately leaves everything else as it was: the cart is preserved, no
/// order exists, and no counter moved. Without a reference every in-flight
/// checkout for the session is dropped.
#[instrument(skip(session))]
pub async fn cancel(session: Session, Query(query): Query<CancelQuery>) -> Result<StatusCode> {
    let mut pendings = load_pending_checkouts(&session).await;
    match query.reference {
        Some(reference) => {
            pendings.remove(&reference);
        }
        None => pendings.clear(),
    }
    save_pending_checkouts(&session, &pendings).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub reference: String,
}

/// Payment callback: verify the reference and drive order creation.
#[instrument(skip(state, session))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<OrderConfirmation>> {
    let orders = OrderRepository::new(state.pool());

    // A replayed callback for an already-created order returns the same
    // confirmation and touches nothing else.
    if let Some(existing) = orders.get_by_reference(&query.reference).await? {
        return Ok(Json(OrderConfirmation {
            reference: query.reference,
            order: Some(existing),
        }));
    }

    // Pre-order failures (declined, abandoned, gateway down) abort the flow
    // and are shown to the shopper; the cart is preserved.
    let verified = state.paystack().verify(&query.reference).await?;

    let pendings = load_pending_checkouts(&session).await;
    let Some(pending) = pendings.get(&verified.reference) else {
        // Funds captured but the checkout context is gone (expired session,
        // foreign reference). Nothing to build an order from.
        tracing::error!(
            reference = %verified.reference,
            "Verified payment with no matching pending checkout; manual reconciliation required"
        );
        return Ok(Json(OrderConfirmation {
            reference: verified.reference,
            order: None,
        }));
    };

    let new_order = build_order(pending);

    if verified.amount != minor_units(new_order.total) {
        tracing::warn!(
            reference = %verified.reference,
            charged = verified.amount,
            expected = minor_units(new_order.total),
            "Charged amount differs from checkout total"
        );
    }

    let order = match orders.create(&new_order).await {
        Ok(order) => order,
        Err(e) => {
            // Payment is authoritative: never show the shopper a failure for
            // money already captured.
            tracing::error!(
                reference = %verified.reference,
                error = %e,
                "Order write failed after successful payment; manual reconciliation required"
            );
            return Ok(Json(OrderConfirmation {
                reference: verified.reference,
                order: None,
            }));
        }
    };

    finish_order(&state, &session, pending, &order).await;

    Ok(Json(OrderConfirmation {
        reference: order.reference.clone(),
        order: Some(order),
    }))
}

/// Assemble the order payload from the pending context.
///
/// Only the snapshot taken at checkout start feeds the order; the live
/// session cart may have diverged since and is deliberately not consulted.
fn build_order(pending: &PendingCheckout) -> NewOrder {
    let lines: Vec<OrderLine> = pending
        .cart
        .items()
        .iter()
        .map(|item| OrderLine {
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            size: item.size.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            image_url: item.image_url.clone(),
        })
        .collect();

    let subtotal = pending.cart.subtotal();
    let discount_amount = pending
        .applied_code
        .as_ref()
        .map_or(rust_decimal::Decimal::ZERO, |code| {
            code.discount_on(subtotal)
        });

    NewOrder {
        user_id: None,
        user_name: pending.shipping.recipient(),
        user_email: pending.email.clone(),
        lines,
        subtotal,
        applied_code: pending
            .applied_code
            .as_ref()
            .map(|code| code.code().to_owned()),
        discount_amount,
        total: subtotal - discount_amount,
        reference: pending.reference.clone(),
    }
}

/// Post-creation side effects: attribution, user bookkeeping, notifications,
/// cart clearing. All best-effort; the order already exists.
async fn finish_order(
    state: &AppState,
    session: &Session,
    pending: &PendingCheckout,
    order: &Order,
) {
    if let Some(applied) = &pending.applied_code {
        let directory = PromoDirectory::new(state.pool());
        if let Err(e) = directory.record_redemption(applied, order.subtotal).await {
            tracing::error!(
                code = applied.code(),
                reference = %order.reference,
                error = %e,
                "Attribution update failed"
            );
        }
    }

    // Link the order's shopper record and remember the shipping address.
    let users = UserRepository::new(state.pool());
    let orders = OrderRepository::new(state.pool());
    match users.get_or_create(&order.user_name, &order.user_email).await {
        Ok(user) => {
            if let Err(e) = users.save_shipping_address(user.id, &pending.shipping).await {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to save shipping address");
            }
            if let Err(e) = orders.link_user(order.id, user.id).await {
                tracing::warn!(order_id = %order.id, error = %e, "Failed to link order to user");
            }
        }
        Err(e) => {
            tracing::warn!(reference = %order.reference, error = %e, "Failed to upsert shopper");
        }
    }

    let mailer = state.mailer().clone();
    let confirmation_order = order.clone();
    fire_and_forget("order confirmation", async move {
        mailer.send_order_confirmation(&confirmation_order).await
    });

    let mailer = state.mailer().clone();
    let alert_order = order.clone();
    fire_and_forget("new order alert", async move {
        mailer.send_new_order_alert(&alert_order).await
    });

    // Clear the cart and the pending context last; a failure here leaves a
    // stale cart, not a broken order.
    if let Err(e) = save_cart(session, &Cart::new()).await {
        tracing::warn!(reference = %order.reference, error = %e, "Failed to clear cart");
    }
    let mut pendings = load_pending_checkouts(session).await;
    pendings.remove(&order.reference);
    if let Err(e) = save_pending_checkouts(session, &pendings).await {
        tracing::warn!(reference = %order.reference, error = %e, "Failed to clear pending checkout");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use luna_core::promo::PromoCode;
    use luna_core::types::id::{ProductId, PromoCodeId};
    use luna_core::types::status::DiscountType;
    use luna_core::CartItem;

    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm {
            first_name: "Amina".to_owned(),
            last_name: "Otieno".to_owned(),
            email: "amina@example.com".to_owned(),
            address: "14 Riverside Drive".to_owned(),
            city: "Nairobi".to_owned(),
            zip_code: "00100".to_owned(),
            country: "Kenya".to_owned(),
            promo_code: None,
        }
    }

    fn cart_with_items() -> Cart {
        let mut cart = Cart::new();
        let product_id = ProductId::new(1);
        cart.add_item(CartItem {
            id: CartItem::line_id(product_id, "250ml"),
            product_id,
            product_name: "Body Oil".to_owned(),
            size: "250ml".to_owned(),
            unit_price: Decimal::from(450),
            quantity: 2,
            image_url: None,
        });
        cart
    }

    #[test]
    fn test_valid_form_passes() {
        let (shipping, email) = form().validate().unwrap();
        assert_eq!(shipping.recipient(), "Amina Otieno");
        assert_eq!(email.as_str(), "amina@example.com");
    }

    #[test]
    fn test_missing_fields_reported_per_field() {
        let mut bad = form();
        bad.first_name = String::new();
        bad.city = "   ".to_owned();

        let errors = bad.validate().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["first_name", "city"]);
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut bad = form();
        bad.email = "not-an-email".to_owned();

        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");
    }

    #[test]
    fn test_build_order_snapshots_cart_and_discount() {
        let cart = cart_with_items();
        let (shipping, email) = form().validate().unwrap();

        let promo = PromoCode {
            id: PromoCodeId::new(1),
            code: "SUMMER10".to_owned(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            times_used: 0,
            usage_limit: None,
            expires_at: None,
            created_at: chrono::Utc::now(),
        };

        let pending = PendingCheckout {
            reference: "ref-123".to_owned(),
            shipping,
            email,
            applied_code: Some(AppliedCode::Promo(promo)),
            cart,
        };

        let order = build_order(&pending);
        assert!(order.subtotal_consistent());
        assert_eq!(order.subtotal, Decimal::from(900));
        assert_eq!(order.discount_amount, Decimal::from(90));
        assert_eq!(order.total, Decimal::from(810));
        assert_eq!(order.applied_code.as_deref(), Some("SUMMER10"));
        assert_eq!(order.reference, "ref-123");
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.user_name, "Amina Otieno");
    }

    #[test]
    fn test_build_order_without_code_has_no_discount() {
        let cart = cart_with_items();
        let (shipping, email) = form().validate().unwrap();
        let pending = PendingCheckout {
            reference: "ref-456".to_owned(),
            shipping,
            email,
            applied_code: None,
            cart,
        };

        let order = build_order(&pending);
        assert_eq!(order.discount_amount, Decimal::ZERO);
        assert_eq!(order.total, order.subtotal);
        assert_eq!(
            order.total,
            Decimal::from_str("900").unwrap()
        );
        assert!(order.applied_code.is_none());
    }

    #[test]
    fn test_order_is_built_from_the_checkout_snapshot() {
        let mut live_cart = cart_with_items();
        let (shipping, email) = form().validate().unwrap();
        let pending = PendingCheckout {
            reference: "ref-789".to_owned(),
            shipping,
            email,
            applied_code: None,
            cart: live_cart.clone(),
        };

        // The shopper keeps editing the cart while the gateway page is open.
        live_cart.clear();

        let order = build_order(&pending);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.total, Decimal::from(900));
    }

    #[test]
    fn test_overlapping_checkouts_keep_separate_contexts() {
        let (shipping, email) = form().validate().unwrap();

        let mut second_cart = Cart::new();
        let product_id = ProductId::new(2);
        second_cart.add_item(CartItem {
            id: CartItem::line_id(product_id, "100g"),
            product_id,
            product_name: "Shea Butter".to_owned(),
            size: "100g".to_owned(),
            unit_price: Decimal::from(300),
            quantity: 1,
            image_url: None,
        });

        let mut pendings = HashMap::new();
        pendings.insert(
            "ref-1".to_owned(),
            PendingCheckout {
                reference: "ref-1".to_owned(),
                shipping: shipping.clone(),
                email: email.clone(),
                applied_code: None,
                cart: cart_with_items(),
            },
        );
        pendings.insert(
            "ref-2".to_owned(),
            PendingCheckout {
                reference: "ref-2".to_owned(),
                shipping,
                email,
                applied_code: None,
                cart: second_cart,
            },
        );

        // Round-trip through the session snapshot format.
        let json = serde_json::to_string(&pendings).unwrap();
        let restored: HashMap<String, PendingCheckout> = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), 2);
        assert_eq!(restored["ref-1"].cart.subtotal(), Decimal::from(900));
        assert_eq!(restored["ref-2"].cart.subtotal(), Decimal::from(300));
    }
}
