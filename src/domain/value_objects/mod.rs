//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(String);

impl Sku {
    pub fn new(value: impl Into<String>) -> Result<Self, SkuError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(SkuError::Empty); }
        if value.len() > 50 { return Err(SkuError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SkuError { Empty, TooLong }
impl std::error::Error for SkuError {}
impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "SKU empty"), Self::TooLong => write!(f, "SKU too long") }
    }
}

/// Two-decimal amount to minor units. `None` when it does not fit an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) * Decimal::ONE_HUNDRED).to_i64()
}

/// On-hand and reserved counts for one sellable unit (a product or one of its variants).
///
/// `available = on_hand - reserved`. A POS overwrite can leave `on_hand` below
/// `reserved`; `available()` then reports zero rather than a negative count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub on_hand: i32,
    pub reserved: i32,
}

impl StockLevel {
    pub fn new(on_hand: i32, reserved: i32) -> Self { Self { on_hand, reserved } }
    pub fn available(&self) -> i32 { (self.on_hand - self.reserved).max(0) }
    pub fn can_reserve(&self, qty: i32) -> bool { qty > 0 && self.available() >= qty }

    /// Converts a reservation into a deduction once payment lands.
    pub fn commit_sale(self, qty: i32) -> Self {
        Self { on_hand: self.on_hand - qty, reserved: (self.reserved - qty).max(0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_sku() { let sku = Sku::new(" tent-2p ").unwrap(); assert_eq!(sku.as_str(), "TENT-2P"); }
    #[test]
    fn test_sku_rejects_blank() { assert_eq!(Sku::new("   "), Err(SkuError::Empty)); }
    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(12345, 2)), Some(12345));
        assert_eq!(to_minor_units(Decimal::new(10005, 3)), Some(1001));
    }
    #[test]
    fn test_stock_reservation_cycle() {
        let level = StockLevel::new(5, 1);
        assert_eq!(level.available(), 4);
        assert!(!level.can_reserve(5));
        assert!(level.can_reserve(4));
        assert!(!level.can_reserve(0));
        let held = StockLevel::new(5, 4);
        assert_eq!(held.commit_sale(3), StockLevel::new(2, 1));
    }
    #[test]
    fn test_overwritten_stock_never_reports_negative() {
        assert_eq!(StockLevel::new(1, 4).available(), 0);
        assert!(!StockLevel::new(1, 4).can_reserve(1));
    }
}
