use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::{Promo, PromoKind};

#[derive(Debug, Clone)]
pub struct PromoFields {
    pub code: String,
    pub description: Option<String>,
    pub kind: PromoKind,
    pub value: Decimal,
    pub min_spend: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

pub async fn list(pool: &PgPool) -> Result<Vec<Promo>, sqlx::Error> {
    sqlx::query_as::<_, Promo>("SELECT * FROM promos ORDER BY created_at DESC").fetch_all(pool).await
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Promo>, sqlx::Error> {
    sqlx::query_as::<_, Promo>("SELECT * FROM promos WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn find_by_code<'e>(db: impl PgExecutor<'e>, code: &str) -> Result<Option<Promo>, sqlx::Error> {
    sqlx::query_as::<_, Promo>("SELECT * FROM promos WHERE code = $1").bind(code).fetch_optional(db).await
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, f: &PromoFields) -> Result<Promo, sqlx::Error> {
    sqlx::query_as::<_, Promo>(
        "INSERT INTO promos (id, code, description, kind, value, min_spend, max_uses, used_count, starts_at, ends_at, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&f.code)
    .bind(&f.description)
    .bind(f.kind.as_str())
    .bind(f.value)
    .bind(f.min_spend)
    .bind(f.max_uses)
    .bind(f.starts_at)
    .bind(f.ends_at)
    .bind(f.is_active)
    .fetch_one(db)
    .await
}

pub async fn update<'e>(db: impl PgExecutor<'e>, id: Uuid, f: &PromoFields) -> Result<Option<Promo>, sqlx::Error> {
    sqlx::query_as::<_, Promo>(
        "UPDATE promos SET code = $2, description = $3, kind = $4, value = $5, min_spend = $6, max_uses = $7,
             starts_at = $8, ends_at = $9, is_active = $10, updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&f.code)
    .bind(&f.description)
    .bind(f.kind.as_str())
    .bind(f.value)
    .bind(f.min_spend)
    .bind(f.max_uses)
    .bind(f.starts_at)
    .bind(f.ends_at)
    .bind(f.is_active)
    .fetch_optional(db)
    .await
}

pub async fn deactivate<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let r = sqlx::query("UPDATE promos SET is_active = FALSE, updated_at = NOW() WHERE id = $1").bind(id).execute(db).await?;
    Ok(r.rows_affected() == 1)
}

/// Counts one use. Returns false if the usage limit was reached in the meantime.
pub async fn redeem<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let r = sqlx::query(
        "UPDATE promos SET used_count = used_count + 1, updated_at = NOW()
         WHERE id = $1 AND (max_uses IS NULL OR used_count < max_uses)",
    )
    .bind(id)
    .execute(db)
    .await?;
    Ok(r.rows_affected() == 1)
}
