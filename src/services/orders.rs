//! Admin order actions after payment: fulfilment, cancellation and refunds.

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::payments::release_reservations;
use crate::db::{self, inventory, StockUnit};
use crate::domain::aggregates::{plan_movement, MovementType, Order, OrderItem, OrderStatus};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::StockLevel;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShipRequest {
    #[validate(length(min = 1, max = 60))]
    pub courier: String,
    #[validate(length(min = 4, max = 60))]
    pub tracking_number: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RefundRequest {
    /// Put the refunded units back on the shelf.
    #[serde(default)]
    pub restock: bool,
}

pub async fn detail(state: &AppState, order_id: Uuid) -> AppResult<OrderDetail> {
    let order = db::orders::find(&state.db, order_id).await?.ok_or_else(|| AppError::not_found("Order"))?;
    let items = db::orders::items(&state.db, order.id).await?;
    Ok(OrderDetail { order, items })
}

/// Storefront lookup: the order number plus the email it was placed with.
pub async fn detail_for_customer(state: &AppState, order_number: &str, email: &str) -> AppResult<OrderDetail> {
    let order = db::orders::find_by_number(&state.db, order_number)
        .await?
        .filter(|o| o.customer_email.eq_ignore_ascii_case(email.trim()))
        .ok_or_else(|| AppError::not_found("Order"))?;
    let items = db::orders::items(&state.db, order.id).await?;
    Ok(OrderDetail { order, items })
}

pub async fn ship(state: &AppState, order_id: Uuid, req: ShipRequest) -> AppResult<Order> {
    req.validate()?;
    let mut tx = state.db.begin().await?;
    let order = lock_for(&mut tx, order_id, OrderStatus::Shipped).await?;
    let order = db::orders::mark_shipped(&mut *tx, order.id, req.courier.trim(), req.tracking_number.trim()).await?;
    tx.commit().await?;
    announce(state, &order).await;
    Ok(order)
}

/// Moves an order along a step that needs no extra data: ready for collection, collected or delivered.
pub async fn advance(state: &AppState, order_id: Uuid, next: OrderStatus) -> AppResult<Order> {
    if !matches!(next, OrderStatus::ReadyForCollection | OrderStatus::Collected | OrderStatus::Delivered) {
        return Err(AppError::validation(format!("{next} cannot be set directly")));
    }
    let mut tx = state.db.begin().await?;
    let order = lock_for(&mut tx, order_id, next).await?;
    let order = db::orders::set_status(&mut *tx, order.id, next).await?;
    tx.commit().await?;
    announce(state, &order).await;
    Ok(order)
}

/// Cancels an unpaid order and releases whatever it still holds.
pub async fn cancel(state: &AppState, order_id: Uuid) -> AppResult<Order> {
    let mut tx = state.db.begin().await?;
    let order = lock_for(&mut tx, order_id, OrderStatus::Cancelled).await?;
    if order.stock_reserved {
        release_reservations(&mut tx, &order).await?;
    }
    let order = db::orders::set_status(&mut *tx, order.id, OrderStatus::Cancelled).await?;
    tx.commit().await?;
    announce(state, &order).await;
    Ok(order)
}

pub async fn refund(state: &AppState, order_id: Uuid, req: RefundRequest) -> AppResult<Order> {
    let mut tx = state.db.begin().await?;
    let order = lock_for(&mut tx, order_id, OrderStatus::Refunded).await?;
    if req.restock {
        for item in db::orders::items(&mut *tx, order.id).await? {
            restock(&mut tx, &order, &item).await?;
        }
    }
    let order = db::orders::set_status(&mut *tx, order.id, OrderStatus::Refunded).await?;
    tx.commit().await?;
    tracing::info!(order_number = %order.order_number, restock = req.restock, "Order refunded");
    announce(state, &order).await;
    Ok(order)
}

async fn restock(conn: &mut PgConnection, order: &Order, item: &OrderItem) -> AppResult<()> {
    let unit = StockUnit::new(item.product_id, item.variant_id);
    let level = inventory::lock_level(&mut *conn, unit)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Stock row missing for {}", item.sku)))?;
    let plan = plan_movement(level, MovementType::Adjust, item.quantity)?;
    let movement = inventory::NewMovement {
        product_id: item.product_id,
        variant_id: item.variant_id,
        movement_type: MovementType::Adjust,
        quantity: plan.delta,
        previous_quantity: plan.previous_quantity,
        new_quantity: plan.new_quantity,
        reason: Some("Refund restock"),
        reference: Some(&order.order_number),
    };
    inventory::apply_movement(conn, unit, StockLevel { on_hand: plan.new_quantity, ..level }, &movement).await?;
    Ok(())
}

/// Locks the order and checks it may move to `next`.
async fn lock_for(conn: &mut PgConnection, order_id: Uuid, next: OrderStatus) -> AppResult<Order> {
    let order = db::orders::lock(&mut *conn, order_id).await?.ok_or_else(|| AppError::not_found("Order"))?;
    order.status.transition(next, order.delivery_method)?;
    Ok(order)
}

async fn announce(state: &AppState, order: &Order) {
    tracing::info!(order_number = %order.order_number, status = %order.status, "Order status changed");
    state
        .events
        .publish(DomainEvent::OrderStatusChanged {
            order_id: order.id,
            order_number: order.order_number.clone(),
            status: order.status.to_string(),
        })
        .await;
}
