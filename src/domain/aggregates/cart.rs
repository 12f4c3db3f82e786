//! Cart Aggregate
//!
//! A cart belongs to a browser session. Lines are keyed by product and variant;
//! prices are not stored here and are read from the catalog when the cart is
//! shown or checked out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on one line, after merging.
pub const MAX_LINE_QUANTITY: i32 = 999;

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    session_id: String,
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

impl CartItem {
    fn same_unit(&self, product_id: Uuid, variant_id: Option<Uuid>) -> bool {
        self.product_id == product_id && self.variant_id == variant_id
    }
}

impl Cart {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), items: vec![], updated_at: Utc::now() }
    }

    /// Builds a cart from stored or submitted lines, merging duplicates.
    pub fn from_items(session_id: impl Into<String>, items: impl IntoIterator<Item = CartItem>) -> Result<Self, CartError> {
        let mut cart = Self::new(session_id);
        for item in items { cart.add_item(item)?; }
        Ok(cart)
    }

    pub fn session_id(&self) -> &str { &self.session_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if !(1..=MAX_LINE_QUANTITY).contains(&item.quantity) { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.same_unit(item.product_id, item.variant_id)) {
            existing.quantity = existing.quantity
                .checked_add(item.quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or(CartError::InvalidQuantity)?;
        } else {
            self.items.push(item);
        }
        self.touch();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: Uuid, variant_id: Option<Uuid>, quantity: i32) -> Result<(), CartError> {
        if !(0..=MAX_LINE_QUANTITY).contains(&quantity) { return Err(CartError::InvalidQuantity); }
        let item = self.items.iter_mut().find(|i| i.same_unit(product_id, variant_id)).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| !i.same_unit(product_id, variant_id)); }
        else { item.quantity = quantity; }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid, variant_id: Option<Uuid>) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| !i.same_unit(product_id, variant_id));
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::ItemNotFound => write!(f, "Item not found"), Self::InvalidQuantity => write!(f, "Quantity must be between 1 and {MAX_LINE_QUANTITY}") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_operations() {
        let boots = Uuid::now_v7();
        let size_42 = Some(Uuid::now_v7());
        let mut cart = Cart::new("sess-1");
        cart.add_item(CartItem { product_id: boots, variant_id: size_42, quantity: 2 }).unwrap();
        cart.add_item(CartItem { product_id: boots, variant_id: size_42, quantity: 1 }).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 3); // Merged

        cart.add_item(CartItem { product_id: boots, variant_id: None, quantity: 1 }).unwrap();
        assert_eq!(cart.item_count(), 2);

        cart.update_quantity(boots, size_42, 0).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.remove_item(boots, size_42), Err(CartError::ItemNotFound));
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let mut cart = Cart::new("sess-2");
        assert_eq!(cart.add_item(CartItem { product_id: Uuid::now_v7(), variant_id: None, quantity: 0 }), Err(CartError::InvalidQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merged_quantity_cannot_overflow() {
        let tent = Uuid::now_v7();
        let mut cart = Cart::new("sess-3");
        cart.add_item(CartItem { product_id: tent, variant_id: None, quantity: 600 }).unwrap();
        assert_eq!(cart.add_item(CartItem { product_id: tent, variant_id: None, quantity: 600 }), Err(CartError::InvalidQuantity));
        assert_eq!(cart.items()[0].quantity, 600);

        let huge = [CartItem { product_id: tent, variant_id: None, quantity: i32::MAX }, CartItem { product_id: tent, variant_id: None, quantity: i32::MAX }];
        assert_eq!(Cart::from_items("sess-4", huge).unwrap_err(), CartError::InvalidQuantity);
        assert_eq!(cart.update_quantity(tent, None, MAX_LINE_QUANTITY + 1), Err(CartError::InvalidQuantity));
    }
}
