use sqlx::types::Json;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::integrations::parcel::{Checkpoint, TrackingInfo, TrackingSource};

/// Last trace cached for an order, if any.
pub async fn find<'e>(db: impl PgExecutor<'e>, order_id: Uuid) -> Result<Option<TrackingInfo>, sqlx::Error> {
    let row: Option<(String, Option<String>, Option<String>, Json<Vec<Checkpoint>>)> = sqlx::query_as(
        "SELECT tracking_number, courier, last_status, checkpoints FROM shipments WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(|(tracking_number, courier, status, Json(checkpoints))| TrackingInfo {
        tracking_number,
        courier,
        status,
        checkpoints,
        source: TrackingSource::Cache,
    }))
}

pub async fn upsert<'e>(db: impl PgExecutor<'e>, order_id: Uuid, info: &TrackingInfo) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO shipments (order_id, courier, tracking_number, last_status, checkpoints, updated_at)
         VALUES ($1, $2, $3, $4, $5, NOW())
         ON CONFLICT (order_id) DO UPDATE SET courier = EXCLUDED.courier, tracking_number = EXCLUDED.tracking_number,
             last_status = EXCLUDED.last_status, checkpoints = EXCLUDED.checkpoints, updated_at = NOW()",
    )
    .bind(order_id)
    .bind(&info.courier)
    .bind(&info.tracking_number)
    .bind(&info.status)
    .bind(Json(&info.checkpoints))
    .execute(db)
    .await?;
    Ok(())
}
