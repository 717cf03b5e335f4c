//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Cart
//! GET  /cart                   - Current cart snapshot
//! POST /cart/add               - Add an item (merges same product+size)
//! POST /cart/update            - Update line quantity (0 removes)
//! POST /cart/remove            - Remove a line
//! GET  /cart/count             - Cart badge count
//!
//! # Checkout
//! POST /checkout               - Validate form + code, initialize payment
//! GET  /checkout/callback      - Payment callback, creates the order
//! POST /checkout/cancel        - Abandon the payment dialog
//!
//! # Auth session
//! POST   /auth/session         - Establish a session for a verified identity
//! GET    /auth/session         - Current user
//! DELETE /auth/session         - Logout
//!
//! # Account (requires auth)
//! GET  /account/orders             - Order history, newest first
//! GET  /account/orders/{reference} - Order detail by payment reference
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::start))
        .route("/callback", get(checkout::callback))
        .route("/cancel", post(checkout::cancel))
}

/// Create the auth session routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new().route(
        "/session",
        post(auth::login).get(auth::me).delete(auth::logout),
    )
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::list))
        .route("/orders/{reference}", get(orders::detail))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
}
