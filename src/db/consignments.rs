use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::aggregates::{Consignment, ConsignmentItem, ConsignmentStatus};

pub async fn list(pool: &PgPool, status: Option<ConsignmentStatus>) -> Result<Vec<Consignment>, sqlx::Error> {
    sqlx::query_as::<_, Consignment>(
        "SELECT * FROM consignments WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC",
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Consignment>, sqlx::Error> {
    sqlx::query_as::<_, Consignment>("SELECT * FROM consignments WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn lock<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Consignment>, sqlx::Error> {
    sqlx::query_as::<_, Consignment>("SELECT * FROM consignments WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(db).await
}

pub async fn items<'e>(db: impl PgExecutor<'e>, consignment_id: Uuid) -> Result<Vec<ConsignmentItem>, sqlx::Error> {
    sqlx::query_as::<_, ConsignmentItem>("SELECT * FROM consignment_items WHERE consignment_id = $1 ORDER BY sku")
        .bind(consignment_id)
        .fetch_all(db)
        .await
}

pub async fn insert<'e>(
    db: impl PgExecutor<'e>,
    reference: &str,
    partner_name: &str,
    partner_contact: Option<&str>,
    commission_rate: Decimal,
    notes: Option<&str>,
) -> Result<Consignment, sqlx::Error> {
    sqlx::query_as::<_, Consignment>(
        "INSERT INTO consignments (id, reference, partner_name, partner_contact, commission_rate, status, notes, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, 'OPEN', $6, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(reference)
    .bind(partner_name)
    .bind(partner_contact)
    .bind(commission_rate)
    .bind(notes)
    .fetch_one(db)
    .await
}

#[derive(Debug, Clone)]
pub struct NewConsignmentItem<'a> {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: &'a str,
    pub quantity_sent: i32,
    pub unit_price: Decimal,
}

pub async fn insert_item<'e>(db: impl PgExecutor<'e>, consignment_id: Uuid, item: &NewConsignmentItem<'_>) -> Result<ConsignmentItem, sqlx::Error> {
    sqlx::query_as::<_, ConsignmentItem>(
        "INSERT INTO consignment_items (id, consignment_id, product_id, variant_id, sku, quantity_sent, quantity_sold, quantity_returned, unit_price)
         VALUES ($1, $2, $3, $4, $5, $6, 0, 0, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(consignment_id)
    .bind(item.product_id)
    .bind(item.variant_id)
    .bind(item.sku)
    .bind(item.quantity_sent)
    .bind(item.unit_price)
    .fetch_one(db)
    .await
}

pub async fn save_item_counts<'e>(db: impl PgExecutor<'e>, item: &ConsignmentItem) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE consignment_items SET quantity_sold = $2, quantity_returned = $3 WHERE id = $1")
        .bind(item.id)
        .bind(item.quantity_sold)
        .bind(item.quantity_returned)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_status<'e>(db: impl PgExecutor<'e>, id: Uuid, status: ConsignmentStatus) -> Result<Consignment, sqlx::Error> {
    sqlx::query_as::<_, Consignment>(
        "UPDATE consignments SET status = $2,
             settled_at = CASE WHEN $2 = 'SETTLED' THEN NOW() ELSE settled_at END,
             updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_one(db)
    .await
}
