//! Cart aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One staged purchase line. `price` is copied from the product at add
/// time and is not live-linked to the catalog. `size` is a free-text
/// variant tag and is part of the uniqueness key together with `product`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub size: String,
    pub price: Decimal,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Per-user staging collection of intended purchases. Totals are derived
/// from the items by every mutator; they are never written independently.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub user: Uuid,
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
}

impl Cart {
    pub fn new(user: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user,
            items: vec![],
            total_items: 0,
            total_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merges into an existing (product, size) line by incrementing its
    /// quantity, or appends a new line. The caller is responsible for
    /// having checked that the product is active and in stock.
    pub fn add_item(&mut self, product: Uuid, quantity: u32, size: &str, unit_price: Decimal) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product == product && i.size == size) {
            existing.quantity += quantity;
        } else {
            self.items.push(CartItem {
                product,
                quantity,
                size: size.to_string(),
                price: unit_price,
                added_at: Utc::now(),
            });
        }
        self.recalculate();
    }

    /// Removes every line matching (product, size). Absent lines are a
    /// no-op success.
    pub fn remove_item(&mut self, product: Uuid, size: &str) {
        self.items.retain(|i| !(i.product == product && i.size == size));
        self.recalculate();
    }

    /// Sets (not increments) the quantity of the matching line. Zero
    /// behaves exactly like [`Cart::remove_item`]; a missing line fails
    /// with [`CartError::ItemNotFound`].
    pub fn update_item_quantity(&mut self, product: Uuid, quantity: u32, size: &str) -> Result<(), CartError> {
        if quantity == 0 {
            self.remove_item(product, size);
            return Ok(());
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product == product && i.size == size)
            .ok_or(CartError::ItemNotFound)?;
        item.quantity = quantity;
        self.recalculate();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.total_items = self.items.iter().map(|i| i.quantity).sum();
        self.total_price = self.items.iter().map(CartItem::line_total).sum();
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        Cart::new(Uuid::now_v7())
    }

    #[test]
    fn test_add_merges_same_product_and_size() {
        let mut cart = cart();
        let p = Uuid::now_v7();
        cart.add_item(p, 2, "", Decimal::from(10));
        cart.add_item(p, 1, "", Decimal::from(10));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.total_price, Decimal::from(30));
    }

    #[test]
    fn test_distinct_sizes_are_distinct_items() {
        let mut cart = cart();
        let p = Uuid::now_v7();
        cart.add_item(p, 1, "small", Decimal::from(10));
        cart.add_item(p, 1, "large", Decimal::from(10));
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.total_items, 2);
    }

    #[test]
    fn test_totals_track_every_mutation() {
        let mut cart = cart();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        cart.add_item(a, 2, "", Decimal::from(300));
        cart.add_item(b, 1, "5kg", Decimal::new(4950, 2));
        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.total_price, Decimal::new(64950, 2));

        cart.update_item_quantity(a, 1, "").unwrap();
        assert_eq!(cart.total_items, 2);
        assert_eq!(cart.total_price, Decimal::new(34950, 2));

        cart.remove_item(b, "5kg");
        assert_eq!(cart.total_items, 1);
        assert_eq!(cart.total_price, Decimal::from(300));

        cart.clear();
        assert_eq!(cart.total_items, 0);
        assert_eq!(cart.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_update_to_zero_equals_remove() {
        let p = Uuid::now_v7();
        let mut via_update = cart();
        via_update.add_item(p, 4, "", Decimal::from(25));
        via_update.update_item_quantity(p, 0, "").unwrap();

        let mut via_remove = Cart::new(via_update.user);
        via_remove.add_item(p, 4, "", Decimal::from(25));
        via_remove.remove_item(p, "");

        assert!(via_update.is_empty());
        assert_eq!(via_update.total_items, via_remove.total_items);
        assert_eq!(via_update.total_price, via_remove.total_price);
    }

    #[test]
    fn test_update_absent_item_fails() {
        let mut cart = cart();
        let err = cart.update_item_quantity(Uuid::now_v7(), 2, "").unwrap_err();
        assert_eq!(err, CartError::ItemNotFound);
    }

    #[test]
    fn test_remove_absent_item_is_noop() {
        let mut cart = cart();
        cart.add_item(Uuid::now_v7(), 1, "", Decimal::from(5));
        cart.remove_item(Uuid::now_v7(), "");
        assert_eq!(cart.total_items, 1);
    }
}
