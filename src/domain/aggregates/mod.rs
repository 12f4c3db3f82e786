//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod stock_movement;
pub mod promo;
pub mod store;
pub mod consignment;

pub use product::{Product, ProductDetail, ProductError, ProductStatus, ProductVariant};
pub use order::{generate_order_number, Address, DeliveryMethod, Order, OrderError, OrderItem, OrderStatus, OrderTotals, PricedLine, ShippingPolicy};
pub use cart::{Cart, CartError, CartItem};
pub use stock_movement::{plan_movement, MovementPlan, MovementType, StockError, StockMovement};
pub use promo::{normalize_code, validate_value, Promo, PromoDiscount, PromoError, PromoKind};
pub use store::{normalize_store_code, CollectionPoint, Store};
pub use consignment::{Consignment, ConsignmentDetail, ConsignmentError, ConsignmentItem, ConsignmentStatus, Settlement,
    validate_commission_rate};
