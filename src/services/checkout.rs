//! Checkout: reserve stock, write the order, open a payment bill.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::{payments, SellableUnit};
use crate::db::{self, inventory, orders::NewOrder};
use crate::domain::aggregates::{
    generate_order_number, normalize_code, Address, Cart, CartItem, DeliveryMethod, Order, OrderError, OrderTotals,
    PricedLine, PromoDiscount, PromoError,
};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::to_minor_units;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 120))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 6, max = 20))]
    pub customer_phone: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub shipping_address: Option<Address>,
    pub collection_point_id: Option<Uuid>,
    pub items: Vec<CheckoutLine>,
    #[validate(length(max = 40))]
    pub promo_code: Option<String>,
    /// Cart to empty once the order is written.
    pub cart_session: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub order_id: Uuid,
    pub order_number: String,
    pub total: Decimal,
    pub payment_url: String,
}

impl CheckoutRequest {
    /// Field validation plus the rules that depend on the delivery method.
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        match self.delivery_method {
            DeliveryMethod::Delivery => {
                let address = self.shipping_address.as_ref().ok_or_else(|| AppError::validation("Delivery orders need a shipping address"))?;
                address.validate()?;
            }
            DeliveryMethod::Pickup if self.collection_point_id.is_none() => {
                return Err(AppError::validation("Pickup orders need a collection point"));
            }
            DeliveryMethod::Pickup => {}
        }
        Ok(())
    }

    /// Lines with duplicates merged.
    fn merged_lines(&self) -> AppResult<Cart> {
        let items = self.items.iter().map(|l| CartItem { product_id: l.product_id, variant_id: l.variant_id, quantity: l.quantity });
        let cart = Cart::from_items(self.cart_session.clone().unwrap_or_default(), items)?;
        if cart.is_empty() {
            return Err(OrderError::NoItems.into());
        }
        Ok(cart)
    }
}

pub async fn place_order(state: &AppState, req: CheckoutRequest) -> AppResult<CheckoutResult> {
    req.check()?;
    let cart = req.merged_lines()?;
    let now = Utc::now();

    let mut tx = state.db.begin().await?;

    if let Some(point_id) = req.collection_point_id.filter(|_| req.delivery_method == DeliveryMethod::Pickup) {
        let point = db::collection_points::find(&mut *tx, point_id).await?;
        if !point.is_some_and(|p| p.is_active) {
            return Err(AppError::not_found("Collection point"));
        }
    }

    let mut lines = Vec::with_capacity(cart.item_count());
    for item in cart.items() {
        lines.push(reserve_line(&mut tx, item).await?);
    }

    let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
    let (promo_code, discount) = match req.promo_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            let (code, discount) = redeem_promo(&mut tx, code, subtotal, now).await?;
            (Some(code), discount)
        }
        None => (None, PromoDiscount::default()),
    };
    let totals = OrderTotals::compute(&lines, req.delivery_method, state.config.shipping, discount.amount, discount.free_shipping);

    let ttl = Duration::from_std(state.config.reservation_ttl).map_err(|e| AppError::Internal(e.to_string()))?;
    let order = insert_with_fresh_number(
        &mut tx,
        NewOrder {
            order_number: "",
            customer_name: req.customer_name.trim(),
            customer_email: req.customer_email.trim(),
            customer_phone: req.customer_phone.as_deref(),
            shipping_address: req.shipping_address.as_ref().filter(|_| req.delivery_method == DeliveryMethod::Delivery),
            delivery_method: req.delivery_method,
            collection_point_id: req.collection_point_id.filter(|_| req.delivery_method == DeliveryMethod::Pickup),
            totals,
            currency: &state.config.currency,
            promo_code: promo_code.as_deref(),
            reservation_expires_at: now + ttl,
        },
        now,
    )
    .await?;
    for line in &lines {
        db::orders::insert_item(&mut *tx, order.id, line).await?;
    }
    if let Some(session) = req.cart_session.as_deref() {
        db::cart::clear(&mut *tx, session).await?;
    }
    tx.commit().await?;

    tracing::info!(order_number = %order.order_number, total = %order.total, lines = lines.len(), "Order placed");
    state
        .events
        .publish(DomainEvent::OrderPlaced { order_id: order.id, order_number: order.order_number.clone(), total: order.total })
        .await;

    open_bill(state, order).await
}

/// Inserts `draft` under a generated order number, drawing again when one is taken.
async fn insert_with_fresh_number(conn: &mut PgConnection, draft: NewOrder<'_>, now: chrono::DateTime<Utc>) -> AppResult<Order> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let number = generate_order_number(now);
        if let Some(order) = db::orders::insert(&mut *conn, &NewOrder { order_number: &number, ..draft }).await? {
            return Ok(order);
        }
        tracing::warn!(order_number = %number, "Order number already taken, drawing another");
    }
    Err(AppError::Conflict("Order number".into()))
}

/// Prices one line and reserves its stock in the open transaction.
async fn reserve_line(conn: &mut PgConnection, item: &CartItem) -> AppResult<PricedLine> {
    let unit = SellableUnit::load(&mut *conn, item.product_id, item.variant_id).await?;
    if !unit.product.is_purchasable() {
        return Err(AppError::rule(format!("{} is not available for sale", unit.product.name)));
    }
    // snapshot first; try_reserve re-checks atomically
    if !unit.stock().can_reserve(item.quantity) || !inventory::try_reserve(&mut *conn, unit.unit(), item.quantity).await? {
        return Err(AppError::InsufficientStock {
            sku: unit.sku().to_string(),
            requested: item.quantity,
            available: unit.stock().available(),
        });
    }
    Ok(PricedLine {
        product_id: unit.product.id,
        variant_id: unit.variant.as_ref().map(|v| v.id),
        sku: unit.sku().to_string(),
        name: unit.name(),
        quantity: item.quantity,
        unit_price: unit.unit_price(),
    })
}

async fn redeem_promo(conn: &mut PgConnection, code: &str, subtotal: Decimal, now: chrono::DateTime<Utc>) -> AppResult<(String, PromoDiscount)> {
    let code = normalize_code(code);
    let promo = db::promos::find_by_code(&mut *conn, &code).await?.ok_or_else(|| AppError::not_found("Promo code"))?;
    let discount = promo.evaluate(subtotal, now)?;
    if !db::promos::redeem(&mut *conn, promo.id).await? {
        return Err(PromoError::UsageLimitReached.into());
    }
    Ok((promo.code, discount))
}

/// Creates the gateway bill. If the gateway is down the order is failed and its stock handed back.
async fn open_bill(state: &AppState, order: Order) -> AppResult<CheckoutResult> {
    let amount = to_minor_units(order.total)
        .ok_or_else(|| AppError::Internal(format!("Order {} total out of range", order.order_number)))?;
    let bill = state
        .payments
        .create_bill(&order.order_number, &order.customer_name, &order.customer_email, order.customer_phone.as_deref(), amount)
        .await;

    match bill {
        Ok(bill) => {
            let order = db::orders::set_bill(&state.db, order.id, &bill.id, &bill.url).await?;
            Ok(CheckoutResult { order_id: order.id, order_number: order.order_number, total: order.total, payment_url: bill.url })
        }
        Err(e) => {
            tracing::error!(order_number = %order.order_number, error = %e, "Bill creation failed, releasing reservation");
            if let Err(release) = payments::fail_payment(state, order.id).await {
                tracing::error!(order_number = %order.order_number, error = %release, "Could not release reservation");
            }
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: DeliveryMethod) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Aina Rahman".into(),
            customer_email: "aina@example.com".into(),
            customer_phone: None,
            delivery_method: method,
            shipping_address: None,
            collection_point_id: None,
            items: vec![],
            promo_code: None,
            cart_session: None,
        }
    }

    fn address() -> Address {
        Address { line1: "12 Jalan Ampang".into(), city: "Kuala Lumpur".into(), postcode: "50450".into(), country: "MY".into(), ..Default::default() }
    }

    #[test]
    fn test_delivery_needs_address() {
        let mut req = request(DeliveryMethod::Delivery);
        assert!(matches!(req.check(), Err(AppError::Validation(_))));
        req.shipping_address = Some(address());
        assert!(req.check().is_ok());
    }

    #[test]
    fn test_pickup_needs_collection_point() {
        let mut req = request(DeliveryMethod::Pickup);
        assert!(matches!(req.check(), Err(AppError::Validation(_))));
        req.collection_point_id = Some(Uuid::now_v7());
        assert!(req.check().is_ok());
    }

    #[test]
    fn test_bad_email_rejected() {
        let mut req = request(DeliveryMethod::Pickup);
        req.collection_point_id = Some(Uuid::now_v7());
        req.customer_email = "not-an-email".into();
        assert!(matches!(req.check(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_duplicate_lines_merge() {
        let product = Uuid::now_v7();
        let mut req = request(DeliveryMethod::Pickup);
        req.items = vec![
            CheckoutLine { product_id: product, variant_id: None, quantity: 1 },
            CheckoutLine { product_id: product, variant_id: None, quantity: 2 },
        ];
        let cart = req.merged_lines().unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn test_oversized_duplicate_lines_rejected() {
        let product = Uuid::now_v7();
        let mut req = request(DeliveryMethod::Pickup);
        req.items = vec![
            CheckoutLine { product_id: product, variant_id: None, quantity: i32::MAX },
            CheckoutLine { product_id: product, variant_id: None, quantity: i32::MAX },
        ];
        assert!(matches!(req.merged_lines(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_order_rejected() {
        let req = request(DeliveryMethod::Pickup);
        assert!(matches!(req.merged_lines(), Err(AppError::BusinessRule(_))));
    }
}
