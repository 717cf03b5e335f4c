//! Storefront domain models and session types.

pub mod user;

use serde::{Deserialize, Serialize};

use luna_core::{Email, UserId, UserRole};

pub use user::{ShippingAddress, User};

/// Session-stored shopper identity.
///
/// Identity is established by the external auth provider; this is the
/// minimal projection the storefront keeps per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
}

/// Session keys for storefront state.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the durable cart snapshot.
    pub const CART: &str = "cart";

    /// Key for the in-flight checkouts awaiting payment callbacks, keyed
    /// by payment reference.
    pub const PENDING_CHECKOUTS: &str = "pending_checkouts";
}
