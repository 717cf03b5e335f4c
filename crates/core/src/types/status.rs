//! Status and role enums for orders, campaigns, and users.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// The permitted transition graph is:
///
/// ```text
/// Pending ──> Shipped ──> Delivered
///    │           │
///    └───────────┴──────> Cancelled
/// ```
///
/// `Delivered` and `Cancelled` are terminal. Transitions outside this graph
/// are rejected by [`crate::order::plan_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether `next` is a legal direct transition from this status.
    ///
    /// A status is never a legal transition target from itself; same-status
    /// requests are handled as no-ops one level up.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered | Self::Cancelled)
        )
    }

    /// Whether this status admits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Influencer campaign lifecycle status.
///
/// Campaigns are created `pending` and become `active` only through explicit
/// acceptance by the named influencer. `archived` campaigns no longer redeem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Pending,
    Active,
    Archived,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("invalid campaign status: {s}")),
        }
    }
}

/// User role across storefront and back-office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
    Influencer,
    Sales,
    Fulfillment,
    DigitalMarketer,
}

impl UserRole {
    /// Roles permitted to change order status.
    #[must_use]
    pub const fn can_manage_orders(self) -> bool {
        matches!(self, Self::Admin | Self::Sales | Self::Fulfillment)
    }

    /// Roles permitted to manage promo codes and campaigns.
    #[must_use]
    pub const fn can_manage_marketing(self) -> bool {
        matches!(self, Self::Admin | Self::DigitalMarketer)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
            Self::Influencer => write!(f, "influencer"),
            Self::Sales => write!(f, "sales"),
            Self::Fulfillment => write!(f, "fulfillment"),
            Self::DigitalMarketer => write!(f, "digital_marketer"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            "influencer" => Ok(Self::Influencer),
            "sales" => Ok(Self::Sales),
            "fulfillment" => Ok(Self::Fulfillment),
            "digital_marketer" => Ok(Self::DigitalMarketer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// Discount kind for a promo code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Percentage of the subtotal, 0-100.
    Percentage,
    /// Fixed amount off, clamped at the subtotal.
    Fixed,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percentage => write!(f, "percentage"),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

impl std::str::FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(format!("invalid discount type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_shipped_transitions() {
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_terminal_states_admit_nothing() {
        for next in [
            OrderStatus::Pending,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert!(!OrderStatus::Delivered.can_transition_to(next));
            assert!(!OrderStatus::Cancelled.can_transition_to(next));
        }
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Fulfillment.can_manage_orders());
        assert!(UserRole::Sales.can_manage_orders());
        assert!(!UserRole::DigitalMarketer.can_manage_orders());
        assert!(UserRole::DigitalMarketer.can_manage_marketing());
        assert!(!UserRole::Influencer.can_manage_marketing());
        assert!(!UserRole::Customer.can_manage_orders());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.to_string().parse().expect("round trip");
            assert_eq!(parsed, status);
        }
    }
}
