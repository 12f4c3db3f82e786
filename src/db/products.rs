//! Products and variants

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{Page, StockUnit};
use crate::domain::aggregates::{Product, ProductStatus, ProductVariant};

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub status: Option<ProductStatus>,
}

pub async fn list(pool: &PgPool, filter: &ProductFilter, page: Page) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let pattern = filter.search.as_ref().map(|s| format!("%{}%", s.trim()));
    let status = filter.status.map(|s| s.as_str());
    const WHERE: &str = "WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
          AND ($3::text IS NULL OR $3 = ANY(tags))";

    let products = sqlx::query_as::<_, Product>(&format!("SELECT * FROM products {WHERE} ORDER BY created_at DESC LIMIT $4 OFFSET $5"))
        .bind(status)
        .bind(&pattern)
        .bind(&filter.tag)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products {WHERE}"))
        .bind(status)
        .bind(&pattern)
        .bind(&filter.tag)
        .fetch_one(pool)
        .await?;
    Ok((products, total.0))
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(db).await
}

pub async fn variants<'e>(db: impl PgExecutor<'e>, product_id: Uuid) -> Result<Vec<ProductVariant>, sqlx::Error> {
    sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE product_id = $1 ORDER BY sku")
        .bind(product_id)
        .fetch_all(db)
        .await
}

pub async fn find_variant<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<ProductVariant>, sqlx::Error> {
    sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE id = $1").bind(id).fetch_optional(db).await
}

#[derive(Debug, Clone)]
pub struct ProductFields {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub status: ProductStatus,
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, fields: &ProductFields, currency: &str, initial_stock: i32) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, sku, name, description, price, currency, stock_quantity, reserved_quantity, status, images, tags, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&fields.sku)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.price)
    .bind(currency)
    .bind(initial_stock)
    .bind(fields.status.as_str())
    .bind(&fields.images)
    .bind(&fields.tags)
    .fetch_one(db)
    .await
}

/// Stock counts are not editable here; they change only through movements, checkout and sync.
pub async fn update<'e>(db: impl PgExecutor<'e>, id: Uuid, fields: &ProductFields) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET sku = $2, name = $3, description = $4, price = $5, status = $6, images = $7, tags = $8, updated_at = NOW()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&fields.sku)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.price)
    .bind(fields.status.as_str())
    .bind(&fields.images)
    .bind(&fields.tags)
    .fetch_optional(db)
    .await
}

pub async fn archive<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let r = sqlx::query("UPDATE products SET status = 'ARCHIVED', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(r.rows_affected() == 1)
}

#[derive(Debug, Clone)]
pub struct VariantFields {
    pub sku: String,
    pub title: String,
    pub price: Option<Decimal>,
}

pub async fn insert_variant<'e>(db: impl PgExecutor<'e>, product_id: Uuid, fields: &VariantFields, initial_stock: i32) -> Result<ProductVariant, sqlx::Error> {
    sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants (id, product_id, sku, title, price, stock_quantity, reserved_quantity, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, 0, NOW(), NOW()) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(&fields.sku)
    .bind(&fields.title)
    .bind(fields.price)
    .bind(initial_stock)
    .fetch_one(db)
    .await
}

pub async fn update_variant<'e>(db: impl PgExecutor<'e>, product_id: Uuid, variant_id: Uuid, fields: &VariantFields) -> Result<Option<ProductVariant>, sqlx::Error> {
    sqlx::query_as::<_, ProductVariant>(
        "UPDATE product_variants SET sku = $3, title = $4, price = $5, updated_at = NOW()
         WHERE id = $2 AND product_id = $1 RETURNING *",
    )
    .bind(product_id)
    .bind(variant_id)
    .bind(&fields.sku)
    .bind(&fields.title)
    .bind(fields.price)
    .fetch_optional(db)
    .await
}

/// Every SKU in the catalog with the unit that carries its stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuStock {
    pub sku: String,
    pub product_id: Uuid,
    pub unit: StockUnit,
    pub stock_quantity: i32,
}

pub async fn sku_index(pool: &PgPool) -> Result<Vec<SkuStock>, sqlx::Error> {
    let rows: Vec<(String, Uuid, Option<Uuid>, i32)> = sqlx::query_as(
        "SELECT sku, product_id, id, stock_quantity FROM product_variants
         UNION ALL
         SELECT sku, id, NULL::uuid, stock_quantity FROM products WHERE status <> 'ARCHIVED'",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(sku, product_id, variant_id, stock_quantity)| SkuStock {
            sku,
            product_id,
            unit: StockUnit::new(product_id, variant_id),
            stock_quantity,
        })
        .collect())
}
