//! Cart route handlers.
//!
//! The cart aggregate lives in `luna_core::cart`; these handlers own its
//! persistence. Every mutation writes the full snapshot back into the
//! durable session store, and a missing or unreadable snapshot restores as
//! an empty cart rather than an error.

use axum::{Json, response::IntoResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use luna_core::{Cart, CartItem, ProductId};

use crate::error::{AppError, Result};
use crate::models::session_keys;

/// Cart display data returned to the client.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub total_items: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            subtotal: cart.subtotal(),
            total_items: cart.total_items(),
        }
    }
}

/// Load the session's cart snapshot, falling back to an empty cart.
///
/// Snapshot corruption (e.g. a schema change between deploys) must never
/// break the shopper, so any parse failure restores empty.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Persist the full cart snapshot into the session.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session
        .insert(session_keys::CART, cart)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist cart: {e}")))
}

/// Add to cart input.
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    pub unit_price: Decimal,
    pub quantity: Option<u32>,
    pub image_url: Option<String>,
}

/// Update cart line input.
#[derive(Debug, Deserialize)]
pub struct UpdateCartInput {
    pub line_id: String,
    pub quantity: u32,
}

/// Remove cart line input.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartInput {
    pub line_id: String,
}

/// Display the current cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    Json(CartView::from(&cart))
}

/// Add an item to the cart.
///
/// Adding the same (product, size) pair again merges into the existing
/// line instead of duplicating it.
#[instrument(skip(session))]
pub async fn add(session: Session, Json(input): Json<AddToCartInput>) -> Result<Json<CartView>> {
    if input.unit_price < Decimal::ZERO {
        return Err(AppError::BadRequest("unit price must not be negative".into()));
    }

    let mut cart = load_cart(&session).await;
    cart.add_item(CartItem {
        id: CartItem::line_id(input.product_id, &input.size),
        product_id: input.product_id,
        product_name: input.product_name,
        size: input.size,
        unit_price: input.unit_price,
        quantity: input.quantity.unwrap_or(1),
        image_url: input.image_url,
    });
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

/// Update a cart line's quantity; 0 removes the line.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Json(input): Json<UpdateCartInput>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    cart.update_quantity(&input.line_id, input.quantity);
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

/// Remove a line from the cart.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Json(input): Json<RemoveFromCartInput>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await;
    cart.remove_item(&input.line_id);
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

/// Get the cart badge count.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u32,
}

#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    Json(CartCount {
        count: cart.total_items(),
    })
}
