use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::Store;

#[derive(Debug, Clone)]
pub struct StoreFields {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub pos_store_id: Option<String>,
    pub is_active: bool,
}

pub async fn list(pool: &PgPool) -> Result<Vec<Store>, sqlx::Error> {
    sqlx::query_as::<_, Store>("SELECT * FROM stores ORDER BY is_default DESC, name").fetch_all(pool).await
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn default_store<'e>(db: impl PgExecutor<'e>) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE is_default").fetch_optional(db).await
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, f: &StoreFields) -> Result<Store, sqlx::Error> {
    sqlx::query_as::<_, Store>(
        "INSERT INTO stores (id, code, name, address, phone, pos_store_id, is_default, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&f.code)
    .bind(&f.name)
    .bind(&f.address)
    .bind(&f.phone)
    .bind(&f.pos_store_id)
    .bind(f.is_active)
    .fetch_one(db)
    .await
}

pub async fn update<'e>(db: impl PgExecutor<'e>, id: Uuid, f: &StoreFields) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query_as::<_, Store>(
        "UPDATE stores SET code = $2, name = $3, address = $4, phone = $5, pos_store_id = $6, is_active = $7, updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&f.code)
    .bind(&f.name)
    .bind(&f.address)
    .bind(&f.phone)
    .bind(&f.pos_store_id)
    .bind(f.is_active)
    .fetch_optional(db)
    .await
}

/// Makes `id` the only default store. Run inside a transaction.
pub async fn set_default(conn: &mut PgConnection, id: Uuid) -> Result<Option<Store>, sqlx::Error> {
    sqlx::query("UPDATE stores SET is_default = FALSE, updated_at = NOW() WHERE is_default AND id <> $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query_as::<_, Store>("UPDATE stores SET is_default = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}
