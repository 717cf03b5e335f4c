//! User model and shipping address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use luna_core::{Email, UserId, UserRole};

/// A shopper or back-office user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shipping details captured at checkout and remembered on the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Recipient name as it appears on the parcel.
    #[must_use]
    pub fn recipient(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
