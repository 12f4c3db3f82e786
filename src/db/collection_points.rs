use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::CollectionPoint;

#[derive(Debug, Clone)]
pub struct CollectionPointFields {
    pub name: String,
    pub address: String,
    pub store_id: Option<Uuid>,
    pub opening_hours: Option<String>,
    pub instructions: Option<String>,
    pub is_active: bool,
}

pub async fn list(pool: &PgPool, active_only: bool) -> Result<Vec<CollectionPoint>, sqlx::Error> {
    sqlx::query_as::<_, CollectionPoint>("SELECT * FROM collection_points WHERE (NOT $1 OR is_active) ORDER BY name")
        .bind(active_only)
        .fetch_all(pool)
        .await
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<CollectionPoint>, sqlx::Error> {
    sqlx::query_as::<_, CollectionPoint>("SELECT * FROM collection_points WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, f: &CollectionPointFields) -> Result<CollectionPoint, sqlx::Error> {
    sqlx::query_as::<_, CollectionPoint>(
        "INSERT INTO collection_points (id, name, address, store_id, opening_hours, instructions, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&f.name)
    .bind(&f.address)
    .bind(f.store_id)
    .bind(&f.opening_hours)
    .bind(&f.instructions)
    .bind(f.is_active)
    .fetch_one(db)
    .await
}

pub async fn update<'e>(db: impl PgExecutor<'e>, id: Uuid, f: &CollectionPointFields) -> Result<Option<CollectionPoint>, sqlx::Error> {
    sqlx::query_as::<_, CollectionPoint>(
        "UPDATE collection_points SET name = $2, address = $3, store_id = $4, opening_hours = $5, instructions = $6,
             is_active = $7, updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&f.name)
    .bind(&f.address)
    .bind(f.store_id)
    .bind(&f.opening_hours)
    .bind(&f.instructions)
    .bind(f.is_active)
    .fetch_optional(db)
    .await
}

pub async fn deactivate<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let r = sqlx::query("UPDATE collection_points SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(r.rows_affected() == 1)
}
