use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem};

pub async fn load<'e>(db: impl PgExecutor<'e>, session_id: &str) -> Result<Vec<CartItem>, sqlx::Error> {
    sqlx::query_as::<_, CartItem>(
        "SELECT product_id, variant_id, quantity FROM cart_items WHERE session_id = $1 ORDER BY created_at",
    )
    .bind(session_id)
    .fetch_all(db)
    .await
}

/// Replaces the stored lines with the cart's current lines.
pub async fn save(pool: &PgPool, cart: &Cart) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1").bind(cart.session_id()).execute(&mut *tx).await?;
    for item in cart.items() {
        sqlx::query(
            "INSERT INTO cart_items (id, session_id, product_id, variant_id, quantity, created_at) VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(Uuid::now_v7())
        .bind(cart.session_id())
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn clear<'e>(db: impl PgExecutor<'e>, session_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1").bind(session_id).execute(db).await?;
    Ok(())
}
