//! HTTP route handlers for the admin panel.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Auth session
//! POST   /auth/session         - Establish an operator session
//! GET    /auth/session         - Current operator
//! DELETE /auth/session         - Logout
//!
//! # Orders (admin, sales, fulfillment)
//! GET  /orders                 - All orders, newest first
//! GET  /orders/{id}            - Order detail
//! POST /orders/{id}/status     - Apply a status transition
//!
//! # Promo codes (admin, digital marketer)
//! GET  /promos                 - All promo codes
//! POST /promos                 - Create a promo code
//!
//! # Campaigns (admin, digital marketer; accept also by the influencer)
//! GET  /campaigns              - All campaigns with derived commission
//! POST /campaigns              - Create a pending campaign
//! POST /campaigns/{id}/accept  - Activate a pending campaign
//! POST /campaigns/{id}/archive - Retire a campaign
//!
//! # Influencer portal
//! GET  /portal/campaigns       - Own campaigns with commission owed
//!
//! # Users (admin only)
//! GET  /users?q=               - List or search users
//! POST /users/{id}/role        - Replace a user's role
//! ```

pub mod auth;
pub mod campaigns;
pub mod orders;
pub mod promos;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth session routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new().route(
        "/session",
        post(auth::login).get(auth::me).delete(auth::logout),
    )
}

/// Create the order management routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::detail))
        .route("/{id}/status", post(orders::update_status))
}

/// Create the promo code routes router.
pub fn promo_routes() -> Router<AppState> {
    Router::new().route("/", get(promos::list).post(promos::create))
}

/// Create the campaign routes router.
pub fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(campaigns::list).post(campaigns::create))
        .route("/{id}/accept", post(campaigns::accept))
        .route("/{id}/archive", post(campaigns::archive))
}

/// Create the user administration routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/{id}/role", post(users::set_role))
}

/// Create all routes for the admin panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/orders", order_routes())
        .nest("/promos", promo_routes())
        .nest("/campaigns", campaign_routes())
        .route("/portal/campaigns", get(campaigns::portal))
        .nest("/users", user_routes())
}
