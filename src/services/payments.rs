//! Payment outcomes: confirmation, failure and reservation expiry.
//!
//! Confirmation is where a reservation turns into a deduction. The order row is
//! locked first so two deliveries of the same notification serialize, and the
//! second one sees `paid_at` already set.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{inventory, orders, StockUnit};
use crate::domain::aggregates::{DeliveryMethod, MovementType, Order, OrderError, OrderItem, OrderStatus};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{to_minor_units, StockLevel};
use crate::error::{AppError, AppResult};
use crate::integrations::payment_gateway::{PaymentNotification, PaymentState};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Confirmed,
    AlreadyPaid,
    Failed,
    AlreadyFailed,
}

/// Applies a verified gateway notification to its order.
pub async fn handle_notification(state: &AppState, n: &PaymentNotification) -> AppResult<PaymentOutcome> {
    let order = orders::find_by_payment_reference(&state.db, n.reference.as_deref(), &n.bill_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    match n.status {
        PaymentState::Paid => confirm_payment(state, order.id, n.amount, n.paid_at.unwrap_or_else(Utc::now)).await,
        PaymentState::Failed | PaymentState::Expired => fail_payment(state, order.id).await,
    }
}

pub async fn confirm_payment(state: &AppState, order_id: Uuid, amount_minor: i64, paid_at: DateTime<Utc>) -> AppResult<PaymentOutcome> {
    let mut tx = state.db.begin().await?;
    let order = orders::lock(&mut *tx, order_id).await?.ok_or_else(|| AppError::not_found("Order"))?;

    if order.paid_at.is_some() {
        tracing::info!(order_number = %order.order_number, "Order already paid, nothing to do");
        return Ok(PaymentOutcome::AlreadyPaid);
    }

    let expected = to_minor_units(order.total)
        .ok_or_else(|| AppError::Internal(format!("Order {} total out of range", order.order_number)))?;
    if expected != amount_minor {
        tracing::warn!(order_number = %order.order_number, expected, received = amount_minor, "Paid amount does not match order total");
        return Err(AppError::rule(format!("Paid amount {amount_minor} does not match order total {expected}")));
    }
    order.status.transition(OrderStatus::Paid, order.delivery_method)?;

    for item in orders::items(&mut *tx, order.id).await? {
        record_sale(&mut tx, &order, &item).await?;
    }
    let order = orders::mark_paid(&mut *tx, order.id, paid_at).await?;
    tx.commit().await?;

    tracing::info!(order_number = %order.order_number, total = %order.total, "Payment confirmed");
    state
        .events
        .publish(DomainEvent::PaymentConfirmed { order_id: order.id, order_number: order.order_number, amount: order.total })
        .await;
    Ok(PaymentOutcome::Confirmed)
}

/// Deducts one sold line from stock and writes its SALE movement.
///
/// The payment has already been taken, so a shortfall caused by a POS overwrite
/// clamps on-hand at zero instead of failing the confirmation.
async fn record_sale(conn: &mut PgConnection, order: &Order, item: &OrderItem) -> AppResult<()> {
    let unit = StockUnit::new(item.product_id, item.variant_id);
    let level = inventory::lock_level(&mut *conn, unit)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Stock row missing for {}", item.sku)))?;

    let after = sale_level(level, item.quantity, order.stock_reserved);
    if after.on_hand != level.on_hand - item.quantity {
        tracing::warn!(order_number = %order.order_number, sku = %item.sku, on_hand = level.on_hand, sold = item.quantity, "Sale exceeds on-hand stock, clamped at zero");
    }

    let movement = inventory::NewMovement {
        product_id: item.product_id,
        variant_id: item.variant_id,
        movement_type: MovementType::Sale,
        quantity: after.on_hand - level.on_hand,
        previous_quantity: level.on_hand,
        new_quantity: after.on_hand,
        reason: Some("Payment confirmed"),
        reference: Some(&order.order_number),
    };
    inventory::apply_movement(conn, unit, after, &movement).await?;
    Ok(())
}

/// Stock level after selling `qty` units. Only orders that still hold their
/// reservation consume reserved units.
fn sale_level(level: StockLevel, qty: i32, reserved: bool) -> StockLevel {
    let after = if reserved { level.commit_sale(qty) } else { StockLevel { on_hand: level.on_hand - qty, ..level } };
    StockLevel { on_hand: after.on_hand.max(0), ..after }
}

/// Whether a failure notification changes an order in `status`.
///
/// `Ok(false)` for an order that has already failed. Paid, cancelled and
/// refunded orders cannot fail, which is an invalid transition.
fn failure_applies(status: OrderStatus, method: DeliveryMethod, paid: bool) -> Result<bool, OrderError> {
    let can_fail = status == OrderStatus::PaymentFailed || status.can_transition_to(OrderStatus::PaymentFailed, method);
    if paid || !can_fail {
        return Err(OrderError::InvalidTransition { from: status, to: OrderStatus::PaymentFailed });
    }
    Ok(status != OrderStatus::PaymentFailed)
}

/// Marks the order PAYMENT_FAILED and hands its reserved stock back.
pub async fn fail_payment(state: &AppState, order_id: Uuid) -> AppResult<PaymentOutcome> {
    let mut tx = state.db.begin().await?;
    let order = orders::lock(&mut *tx, order_id).await?.ok_or_else(|| AppError::not_found("Order"))?;

    let applies = failure_applies(order.status, order.delivery_method, order.paid_at.is_some()).map_err(|e| {
        tracing::warn!(order_number = %order.order_number, status = %order.status, "Payment failure for an order that cannot fail");
        AppError::from(e)
    })?;
    if !applies {
        tracing::info!(order_number = %order.order_number, "Payment already marked failed");
        return Ok(PaymentOutcome::AlreadyFailed);
    }
    if order.stock_reserved {
        release_reservations(&mut tx, &order).await?;
    }
    orders::set_status(&mut *tx, order.id, OrderStatus::PaymentFailed).await?;
    tx.commit().await?;

    tracing::info!(order_number = %order.order_number, "Payment failed, reservation released");
    state
        .events
        .publish(DomainEvent::PaymentFailed { order_id: order.id, order_number: order.order_number })
        .await;
    Ok(PaymentOutcome::Failed)
}

/// Cancels unpaid orders whose reservation window has passed. Returns how many were cancelled.
pub async fn release_expired(state: &AppState) -> AppResult<usize> {
    let expired = orders::expired_reservations(&state.db, Utc::now()).await?;
    let mut cancelled = 0;
    for order_id in expired {
        let mut tx = state.db.begin().await?;
        let Some(order) = orders::lock(&mut *tx, order_id).await? else { continue };
        // paid or cancelled since the scan
        if !order.status.holds_reservation() {
            continue;
        }
        if order.stock_reserved {
            release_reservations(&mut tx, &order).await?;
        }
        let order = orders::set_status(&mut *tx, order.id, OrderStatus::Cancelled).await?;
        tx.commit().await?;

        tracing::info!(order_number = %order.order_number, "Reservation expired, order cancelled");
        state
            .events
            .publish(DomainEvent::OrderStatusChanged { order_id: order.id, order_number: order.order_number, status: order.status.to_string() })
            .await;
        cancelled += 1;
    }
    Ok(cancelled)
}

pub(crate) async fn release_reservations(conn: &mut PgConnection, order: &Order) -> AppResult<()> {
    for item in orders::items(&mut *conn, order.id).await? {
        inventory::release(&mut *conn, StockUnit::new(item.product_id, item.variant_id), item.quantity).await?;
    }
    orders::mark_released(&mut *conn, order.id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_consumes_reservation() {
        let after = sale_level(StockLevel::new(10, 3), 2, true);
        assert_eq!(after, StockLevel::new(8, 1));
    }

    #[test]
    fn test_sale_after_release_leaves_other_reservations() {
        let after = sale_level(StockLevel::new(10, 3), 2, false);
        assert_eq!(after, StockLevel::new(8, 3));
    }

    #[test]
    fn test_pending_order_can_fail() {
        assert_eq!(failure_applies(OrderStatus::Pending, DeliveryMethod::Delivery, false), Ok(true));
        assert_eq!(failure_applies(OrderStatus::Pending, DeliveryMethod::Pickup, false), Ok(true));
        assert_eq!(failure_applies(OrderStatus::PaymentFailed, DeliveryMethod::Delivery, false), Ok(false));
    }

    #[test]
    fn test_failure_after_payment_is_rejected() {
        for status in [OrderStatus::Paid, OrderStatus::Shipped, OrderStatus::Cancelled, OrderStatus::Refunded] {
            let err = failure_applies(status, DeliveryMethod::Delivery, status != OrderStatus::Cancelled).unwrap_err();
            assert_eq!(err, OrderError::InvalidTransition { from: status, to: OrderStatus::PaymentFailed });
            assert_eq!(AppError::from(err).status(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        }
        // gateway says failed but the order row already carries a payment
        assert!(failure_applies(OrderStatus::Pending, DeliveryMethod::Delivery, true).is_err());
    }

    #[test]
    fn test_sale_clamps_at_zero() {
        let after = sale_level(StockLevel::new(1, 2), 2, true);
        assert_eq!(after, StockLevel::new(0, 0));
    }
}
