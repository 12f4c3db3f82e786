//! Stock counters and the movement ledger

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::StockUnit;
use crate::domain::aggregates::{MovementType, StockMovement};
use crate::domain::value_objects::StockLevel;

const MOVEMENT_COLUMNS: &str =
    "id, product_id, variant_id, movement_type, quantity, previous_quantity, new_quantity, reason, reference, created_at";

/// Reserve `qty` units if that many are still available. Returns false when they are not.
///
/// The availability check and the increment are one statement, so two checkouts
/// racing for the last unit cannot both win.
pub async fn try_reserve<'e>(db: impl PgExecutor<'e>, unit: StockUnit, qty: i32) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET reserved_quantity = reserved_quantity + $2, updated_at = NOW()
         WHERE id = $1 AND stock_quantity - reserved_quantity >= $2",
        unit.table()
    );
    let result = sqlx::query(&sql).bind(unit.id()).bind(qty).execute(db).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn release<'e>(db: impl PgExecutor<'e>, unit: StockUnit, qty: i32) -> Result<(), sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET reserved_quantity = GREATEST(reserved_quantity - $2, 0), updated_at = NOW() WHERE id = $1",
        unit.table()
    );
    sqlx::query(&sql).bind(unit.id()).bind(qty).execute(db).await?;
    Ok(())
}

/// Current counters with the row locked until the transaction ends.
pub async fn lock_level<'e>(db: impl PgExecutor<'e>, unit: StockUnit) -> Result<Option<StockLevel>, sqlx::Error> {
    let sql = format!("SELECT stock_quantity, reserved_quantity FROM {} WHERE id = $1 FOR UPDATE", unit.table());
    let row: Option<(i32, i32)> = sqlx::query_as(&sql).bind(unit.id()).fetch_optional(db).await?;
    Ok(row.map(|(on_hand, reserved)| StockLevel::new(on_hand, reserved)))
}

pub async fn write_level<'e>(db: impl PgExecutor<'e>, unit: StockUnit, level: StockLevel) -> Result<(), sqlx::Error> {
    let sql = format!(
        "UPDATE {} SET stock_quantity = $2, reserved_quantity = $3, updated_at = NOW() WHERE id = $1",
        unit.table()
    );
    sqlx::query(&sql).bind(unit.id()).bind(level.on_hand).bind(level.reserved).execute(db).await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub reason: Option<&'a str>,
    pub reference: Option<&'a str>,
}

pub async fn insert_movement<'e>(db: impl PgExecutor<'e>, m: &NewMovement<'_>) -> Result<StockMovement, sqlx::Error> {
    let sql = format!(
        "INSERT INTO stock_movements ({MOVEMENT_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW()) RETURNING {MOVEMENT_COLUMNS}"
    );
    sqlx::query_as::<_, StockMovement>(&sql)
        .bind(Uuid::now_v7())
        .bind(m.product_id)
        .bind(m.variant_id)
        .bind(m.movement_type.as_str())
        .bind(m.quantity)
        .bind(m.previous_quantity)
        .bind(m.new_quantity)
        .bind(m.reason)
        .bind(m.reference)
        .fetch_one(db)
        .await
}

pub async fn list_movements(pool: &PgPool, product_id: Option<Uuid>, limit: i64, offset: i64) -> Result<Vec<StockMovement>, sqlx::Error> {
    let sql = format!(
        "SELECT {MOVEMENT_COLUMNS} FROM stock_movements
         WHERE ($1::uuid IS NULL OR product_id = $1)
         ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    );
    sqlx::query_as::<_, StockMovement>(&sql).bind(product_id).bind(limit).bind(offset).fetch_all(pool).await
}

pub async fn list_archived(pool: &PgPool, product_id: Option<Uuid>, limit: i64, offset: i64) -> Result<Vec<StockMovement>, sqlx::Error> {
    let sql = format!(
        "SELECT {MOVEMENT_COLUMNS} FROM stock_movements_archive
         WHERE ($1::uuid IS NULL OR product_id = $1)
         ORDER BY created_at DESC LIMIT $2 OFFSET $3"
    );
    sqlx::query_as::<_, StockMovement>(&sql).bind(product_id).bind(limit).bind(offset).fetch_all(pool).await
}

/// Moves every movement older than `cutoff` into the archive table. One statement, so it is all-or-nothing.
pub async fn archive_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let sql = format!(
        "WITH moved AS (DELETE FROM stock_movements WHERE created_at < $1 RETURNING {MOVEMENT_COLUMNS})
         INSERT INTO stock_movements_archive ({MOVEMENT_COLUMNS}) SELECT {MOVEMENT_COLUMNS} FROM moved"
    );
    Ok(sqlx::query(&sql).bind(cutoff).execute(pool).await?.rows_affected())
}

pub async fn restore(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    let sql = format!(
        "WITH moved AS (DELETE FROM stock_movements_archive WHERE id = ANY($1) RETURNING {MOVEMENT_COLUMNS})
         INSERT INTO stock_movements ({MOVEMENT_COLUMNS}) SELECT {MOVEMENT_COLUMNS} FROM moved"
    );
    Ok(sqlx::query(&sql).bind(ids).execute(pool).await?.rows_affected())
}

/// Applies `level` and appends the movement that explains it, in the caller's transaction.
pub async fn apply_movement(conn: &mut PgConnection, unit: StockUnit, level: StockLevel, movement: &NewMovement<'_>) -> Result<StockMovement, sqlx::Error> {
    write_level(&mut *conn, unit, level).await?;
    insert_movement(&mut *conn, movement).await
}
