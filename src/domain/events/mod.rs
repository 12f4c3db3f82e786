//! Domain events
//!
//! Published on NATS under `basecamp.<subject>` when a broker is configured.
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, order_number: String, total: Decimal },
    PaymentConfirmed { order_id: Uuid, order_number: String, amount: Decimal },
    PaymentFailed { order_id: Uuid, order_number: String },
    OrderStatusChanged { order_id: Uuid, order_number: String, status: String },
    StockMoved { product_id: Uuid, variant_id: Option<Uuid>, movement_type: String, delta: i32, new_quantity: i32 },
    InventorySynced { updated: usize, unmatched: usize },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "order.placed",
            Self::PaymentConfirmed { .. } => "payment.confirmed",
            Self::PaymentFailed { .. } => "payment.failed",
            Self::OrderStatusChanged { .. } => "order.status_changed",
            Self::StockMoved { .. } => "stock.moved",
            Self::InventorySynced { .. } => "inventory.synced",
        }
    }
}
