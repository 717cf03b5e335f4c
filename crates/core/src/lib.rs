//! Shared domain types and pure logic for Luna Botanicals commerce.
//!
//! This crate holds everything both binaries agree on: entity ids, money,
//! the cart aggregate, promo/campaign types with their validation rules,
//! and the order status state machine. It performs no I/O; persistence and
//! notification live in the storefront and admin crates.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod promo;
pub mod types;

pub use cart::{Cart, CartItem};
pub use order::{
    NewOrder, Order, OrderEffect, OrderLine, TransitionError, TransitionPlan, plan_transition,
};
pub use promo::{
    AppliedCode, CodeError, InfluencerCampaign, PromoCode, normalize_code, validate_discount,
};
pub use types::email::{Email, EmailError};
pub use types::id::{CampaignId, OrderId, ProductId, PromoCodeId, UserId};
pub use types::money::minor_units;
pub use types::status::{CampaignStatus, DiscountType, OrderStatus, UserRole};
