//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<Json<Address>>,
    #[sqlx(try_from = "String")]
    pub delivery_method: DeliveryMethod,
    pub collection_point_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub promo_code: Option<String>,
    pub payment_bill_id: Option<String>,
    pub payment_url: Option<String>,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub reservation_expires_at: Option<DateTime<Utc>>,
    /// True while the order's lines are still counted in `reserved_quantity`.
    pub stock_reserved: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Address {
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 3, max = 12))]
    pub postcode: String,
    #[validate(length(min = 2, max = 60))]
    pub country: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    PaymentFailed,
    Shipped,
    Delivered,
    Refunded,
    ReadyForCollection,
    Collected,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod { #[default] Delivery, Pickup }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Refunded => "REFUNDED",
            Self::ReadyForCollection => "READY_FOR_COLLECTION",
            Self::Collected => "COLLECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Orders in these states still hold a stock reservation.
    pub fn holds_reservation(&self) -> bool { matches!(self, Self::Pending | Self::PaymentFailed) }

    pub fn can_transition_to(&self, next: OrderStatus, method: DeliveryMethod) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Paid | PaymentFailed | Cancelled) => true,
            (PaymentFailed, Paid | Cancelled) => true,
            (Paid, Shipped) => method == DeliveryMethod::Delivery,
            (Paid, ReadyForCollection) => method == DeliveryMethod::Pickup,
            (Paid | Shipped | ReadyForCollection | Delivered | Collected, Refunded) => true,
            (Shipped, Delivered) => true,
            (ReadyForCollection, Collected) => true,
            _ => false,
        }
    }

    pub fn transition(self, next: OrderStatus, method: DeliveryMethod) -> Result<OrderStatus, OrderError> {
        if self.can_transition_to(next, method) { Ok(next) } else { Err(OrderError::InvalidTransition { from: self, to: next }) }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl TryFrom<String> for OrderStatus {
    type Error = OrderError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        use OrderStatus::*;
        Ok(match value.as_str() {
            "PENDING" => Pending,
            "PAID" => Paid,
            "PAYMENT_FAILED" => PaymentFailed,
            "SHIPPED" => Shipped,
            "DELIVERED" => Delivered,
            "REFUNDED" => Refunded,
            "READY_FOR_COLLECTION" => ReadyForCollection,
            "COLLECTED" => Collected,
            "CANCELLED" => Cancelled,
            _ => return Err(OrderError::UnknownValue(value)),
        })
    }
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Delivery => "DELIVERY", Self::Pickup => "PICKUP" }
    }
}

impl TryFrom<String> for DeliveryMethod {
    type Error = OrderError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "DELIVERY" => Ok(Self::Delivery),
            "PICKUP" => Ok(Self::Pickup),
            _ => Err(OrderError::UnknownValue(value)),
        }
    }
}

/// Priced line before it is written to `order_items`.
#[derive(Clone, Debug, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Shipping rule: flat fee for delivery, waived at or above the threshold.
#[derive(Clone, Copy, Debug)]
pub struct ShippingPolicy {
    pub flat_fee: Decimal,
    pub free_threshold: Decimal,
}

impl OrderTotals {
    pub fn compute(lines: &[PricedLine], method: DeliveryMethod, shipping: ShippingPolicy, discount: Decimal, free_shipping: bool) -> Self {
        let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
        let discount = discount.max(Decimal::ZERO).min(subtotal);
        let shipping = match method {
            DeliveryMethod::Pickup => Decimal::ZERO,
            DeliveryMethod::Delivery if free_shipping || subtotal >= shipping.free_threshold => Decimal::ZERO,
            DeliveryMethod::Delivery => shipping.flat_fee,
        };
        Self { subtotal, discount, shipping, total: subtotal - discount + shipping }
    }
}

/// `BC-YYYYMMDD-XXXXXXXX`, eight random upper-case hex digits.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    format!("BC-{}-{:08X}", now.format("%Y%m%d"), rand::random::<u32>())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, InvalidTransition { from: OrderStatus, to: OrderStatus }, UnknownValue(String) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order has no items"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {from} to {to}"),
            Self::UnknownValue(v) => write!(f, "Unknown order value: {v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i32, price: i64) -> PricedLine {
        PricedLine { product_id: Uuid::now_v7(), variant_id: None, sku: "STOVE-01".into(), name: "Pocket Stove".into(), quantity: qty, unit_price: Decimal::new(price, 2) }
    }

    fn shipping() -> ShippingPolicy {
        ShippingPolicy { flat_fee: Decimal::new(1000, 2), free_threshold: Decimal::new(20000, 2) }
    }

    #[test]
    fn test_order_workflow_delivery() {
        let status = OrderStatus::Pending;
        let status = status.transition(OrderStatus::Paid, DeliveryMethod::Delivery).unwrap();
        let status = status.transition(OrderStatus::Shipped, DeliveryMethod::Delivery).unwrap();
        let status = status.transition(OrderStatus::Delivered, DeliveryMethod::Delivery).unwrap();
        assert_eq!(status, OrderStatus::Delivered);
        assert!(status.transition(OrderStatus::Refunded, DeliveryMethod::Delivery).is_ok());
    }

    #[test]
    fn test_pickup_orders_cannot_ship() {
        let err = OrderStatus::Paid.transition(OrderStatus::Shipped, DeliveryMethod::Pickup).unwrap_err();
        assert_eq!(err, OrderError::InvalidTransition { from: OrderStatus::Paid, to: OrderStatus::Shipped });
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::ReadyForCollection, DeliveryMethod::Pickup));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::ReadyForCollection, DeliveryMethod::Delivery));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for next in [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Refunded] {
            assert!(!OrderStatus::Refunded.can_transition_to(next, DeliveryMethod::Delivery));
            assert!(!OrderStatus::Cancelled.can_transition_to(next, DeliveryMethod::Delivery));
        }
    }

    #[test]
    fn test_failed_payment_can_be_retried() {
        assert!(OrderStatus::PaymentFailed.can_transition_to(OrderStatus::Paid, DeliveryMethod::Delivery));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::PaymentFailed, DeliveryMethod::Delivery));
    }

    #[test]
    fn test_status_text_round_trip() {
        assert_eq!(OrderStatus::try_from("READY_FOR_COLLECTION".to_string()).unwrap(), OrderStatus::ReadyForCollection);
        assert_eq!(serde_json::to_string(&OrderStatus::PaymentFailed).unwrap(), "\"PAYMENT_FAILED\"");
        assert!(OrderStatus::try_from("paid".to_string()).is_err());
    }

    #[test]
    fn test_totals_charge_shipping_below_threshold() {
        let totals = OrderTotals::compute(&[line(2, 4500)], DeliveryMethod::Delivery, shipping(), Decimal::ZERO, false);
        assert_eq!(totals.subtotal, Decimal::new(9000, 2));
        assert_eq!(totals.shipping, Decimal::new(1000, 2));
        assert_eq!(totals.total, Decimal::new(10000, 2));
    }

    #[test]
    fn test_totals_waive_shipping_and_clamp_discount() {
        let totals = OrderTotals::compute(&[line(1, 25000)], DeliveryMethod::Delivery, shipping(), Decimal::new(30000, 2), false);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.discount, Decimal::new(25000, 2));
        assert_eq!(totals.total, Decimal::ZERO);

        let pickup = OrderTotals::compute(&[line(1, 100)], DeliveryMethod::Pickup, shipping(), Decimal::ZERO, false);
        assert_eq!(pickup.shipping, Decimal::ZERO);
    }

    #[test]
    fn test_order_number_format() {
        use chrono::TimeZone;
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let n = generate_order_number(now);
        assert!(n.starts_with("BC-20261016-"));
        let suffix = &n["BC-20261016-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }
}
