//! Orders and their line items

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::Page;
use crate::domain::aggregates::{Address, DeliveryMethod, Order, OrderItem, OrderStatus, OrderTotals, PricedLine};

#[derive(Debug, Clone, Copy)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub customer_phone: Option<&'a str>,
    pub shipping_address: Option<&'a Address>,
    pub delivery_method: DeliveryMethod,
    pub collection_point_id: Option<Uuid>,
    pub totals: OrderTotals,
    pub currency: &'a str,
    pub promo_code: Option<&'a str>,
    pub reservation_expires_at: DateTime<Utc>,
}

/// `None` when the order number is already taken.
pub async fn insert<'e>(db: impl PgExecutor<'e>, o: &NewOrder<'_>) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, customer_name, customer_email, customer_phone, shipping_address,
             delivery_method, collection_point_id, status, subtotal, discount_total, shipping_total, total, currency,
             promo_code, reservation_expires_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'PENDING', $9, $10, $11, $12, $13, $14, $15, NOW(), NOW())
         ON CONFLICT (order_number) DO NOTHING
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(o.order_number)
    .bind(o.customer_name)
    .bind(o.customer_email)
    .bind(o.customer_phone)
    .bind(o.shipping_address.map(Json))
    .bind(o.delivery_method.as_str())
    .bind(o.collection_point_id)
    .bind(o.totals.subtotal)
    .bind(o.totals.discount)
    .bind(o.totals.shipping)
    .bind(o.totals.total)
    .bind(o.currency)
    .bind(o.promo_code)
    .bind(o.reservation_expires_at)
    .fetch_optional(db)
    .await
}

pub async fn insert_item<'e>(db: impl PgExecutor<'e>, order_id: Uuid, line: &PricedLine) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items (id, order_id, product_id, variant_id, sku, name, quantity, unit_price, line_total)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.variant_id)
    .bind(&line.sku)
    .bind(&line.name)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.line_total())
    .fetch_one(db)
    .await
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn find_by_number<'e>(db: impl PgExecutor<'e>, order_number: &str) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_number = $1").bind(order_number).fetch_optional(db).await
}

/// Order row locked for the rest of the transaction.
pub async fn lock<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(db).await
}

/// Looks an order up by its number, then by payment bill id.
pub async fn find_by_payment_reference<'e>(db: impl PgExecutor<'e>, order_number: Option<&str>, bill_id: &str) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE order_number = $1 OR payment_bill_id = $2
         ORDER BY (order_number = $1) DESC NULLS LAST LIMIT 1",
    )
    .bind(order_number)
    .bind(bill_id)
    .fetch_optional(db)
    .await
}

pub async fn items<'e>(db: impl PgExecutor<'e>, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY sku")
        .bind(order_id)
        .fetch_all(db)
        .await
}

pub async fn list(pool: &PgPool, status: Option<OrderStatus>, page: Page) -> Result<(Vec<Order>, i64), sqlx::Error> {
    let status = status.map(|s| s.as_str());
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR status = $1)")
        .bind(status)
        .fetch_one(pool)
        .await?;
    Ok((orders, total.0))
}

pub async fn set_status<'e>(db: impl PgExecutor<'e>, id: Uuid, status: OrderStatus) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(status.as_str())
        .fetch_one(db)
        .await
}

pub async fn mark_paid<'e>(db: impl PgExecutor<'e>, id: Uuid, paid_at: DateTime<Utc>) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = 'PAID', paid_at = $2, stock_reserved = FALSE, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(paid_at)
    .fetch_one(db)
    .await
}

/// Records that the order's reservations were handed back to stock.
pub async fn mark_released<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET stock_reserved = FALSE, updated_at = NOW() WHERE id = $1").bind(id).execute(db).await?;
    Ok(())
}

pub async fn set_bill<'e>(db: impl PgExecutor<'e>, id: Uuid, bill_id: &str, url: &str) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>("UPDATE orders SET payment_bill_id = $2, payment_url = $3, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(bill_id)
        .bind(url)
        .fetch_one(db)
        .await
}

pub async fn mark_shipped<'e>(db: impl PgExecutor<'e>, id: Uuid, courier: &str, tracking_number: &str) -> Result<Order, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = 'SHIPPED', courier = $2, tracking_number = $3, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(courier)
    .bind(tracking_number)
    .fetch_one(db)
    .await
}

/// Unpaid orders whose reservation window has passed.
pub async fn expired_reservations<'e>(db: impl PgExecutor<'e>, now: DateTime<Utc>) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM orders WHERE status IN ('PENDING', 'PAYMENT_FAILED') AND reservation_expires_at < $1",
    )
    .bind(now)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
