//! The shopper's cart aggregate.
//!
//! A [`Cart`] is a plain value owned by one session. The storefront persists
//! the full snapshot into the session store after every mutation and restores
//! it on the next request; this module only knows the line-merge and totals
//! rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::ProductId;

/// One line in the cart, keyed by the (product, size) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Composite line id, `"{product_id}-{size}"`. Unique within a cart.
    pub id: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: String,
    /// Unit price in major units, never negative.
    pub unit_price: Decimal,
    /// Always at least 1; a quantity update to 0 removes the line.
    pub quantity: u32,
    pub image_url: Option<String>,
}

impl CartItem {
    /// Compute the composite line id for a (product, size) pair.
    #[must_use]
    pub fn line_id(product_id: ProductId, size: &str) -> String {
        format!("{product_id}-{size}")
    }

    /// Line total: unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A session-owned cart of pending selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// The current lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line to the cart.
    ///
    /// If a line for the same (product, size) pair already exists, its
    /// quantity is incremented by the incoming quantity instead of a second
    /// line being appended. The line id is recomputed from the product and
    /// size, so callers cannot smuggle in a mismatched id.
    pub fn add_item(&mut self, mut item: CartItem) {
        item.id = CartItem::line_id(item.product_id, &item.size);
        item.quantity = item.quantity.max(1);

        if let Some(existing) = self.items.iter_mut().find(|line| line.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Remove a line by its composite id. Unknown ids are ignored.
    pub fn remove_item(&mut self, id: &str) {
        self.items.retain(|line| line.id != id);
    }

    /// Replace a line's quantity. A quantity of 0 removes the line.
    pub fn update_quantity(&mut self, id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove_item(id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|line| line.id == id) {
            line.quantity = quantity;
        }
    }

    /// Empty the cart (after a successful order placement).
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Σ(unit price × quantity) over the current lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total unit count across all lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, line| acc.saturating_add(line.quantity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn item(product: i64, size: &str, price: &str, quantity: u32) -> CartItem {
        let product_id = ProductId::new(product);
        CartItem {
            id: CartItem::line_id(product_id, size),
            product_id,
            product_name: format!("Product {product}"),
            size: size.to_owned(),
            unit_price: Decimal::from_str(price).unwrap(),
            quantity,
            image_url: None,
        }
    }

    #[test]
    fn test_add_same_pair_merges_quantities() {
        let mut cart = Cart::new();
        cart.add_item(item(1, "250ml", "450", 1));
        cart.add_item(item(1, "250ml", "450", 2));
        cart.add_item(item(1, "250ml", "450", 3));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 6);
    }

    #[test]
    fn test_same_product_different_size_is_a_new_line() {
        let mut cart = Cart::new();
        cart.add_item(item(1, "250ml", "450", 1));
        cart.add_item(item(1, "500ml", "800", 1));

        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_subtotal_recomputed_after_every_mutation() {
        let mut cart = Cart::new();
        cart.add_item(item(1, "250ml", "450", 2));
        cart.add_item(item(2, "100g", "199.50", 1));
        assert_eq!(cart.subtotal(), Decimal::from_str("1099.50").unwrap());

        cart.update_quantity(&CartItem::line_id(ProductId::new(1), "250ml"), 1);
        assert_eq!(cart.subtotal(), Decimal::from_str("649.50").unwrap());

        cart.remove_item(&CartItem::line_id(ProductId::new(2), "100g"));
        assert_eq!(cart.subtotal(), Decimal::from_str("450").unwrap());

        cart.clear();
        assert_eq!(cart.subtotal(), Decimal::ZERO);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add_item(item(1, "250ml", "450", 2));
        cart.update_quantity(&CartItem::line_id(ProductId::new(1), "250ml"), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_unknown_line_is_ignored() {
        let mut cart = Cart::new();
        cart.add_item(item(1, "250ml", "450", 2));
        cart.update_quantity("999-1L", 5);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_total_items_counts_units() {
        let mut cart = Cart::new();
        cart.add_item(item(1, "250ml", "450", 2));
        cart.add_item(item(2, "100g", "199.50", 3));
        assert_eq!(cart.total_items(), 5);
    }

    #[test]
    fn test_add_enforces_minimum_quantity() {
        let mut cart = Cart::new();
        let mut zero = item(1, "250ml", "450", 1);
        zero.quantity = 0;
        cart.add_item(zero);
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let mut cart = Cart::new();
        cart.add_item(item(1, "250ml", "450", 2));

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}
