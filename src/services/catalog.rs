//! Admin catalog writes. New stock always enters through a RECEIVE movement so
//! the ledger explains every unit on hand.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::db::{inventory, products, StockUnit};
use crate::domain::aggregates::{MovementType, ProductDetail, ProductStatus, ProductVariant};
use crate::domain::value_objects::{Sku, StockLevel};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductRequest {
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only read on create.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub initial_stock: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VariantRequest {
    pub sku: String,
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    pub price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub initial_stock: i32,
}

impl ProductRequest {
    fn fields(&self) -> AppResult<products::ProductFields> {
        self.validate()?;
        check_price(self.price)?;
        Ok(products::ProductFields {
            sku: Sku::new(&self.sku)?.into_inner(),
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            price: self.price,
            status: self.status,
            images: self.images.clone(),
            tags: self.tags.iter().map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()).collect(),
        })
    }
}

impl VariantRequest {
    fn fields(&self) -> AppResult<products::VariantFields> {
        self.validate()?;
        if let Some(price) = self.price {
            check_price(price)?;
        }
        Ok(products::VariantFields { sku: Sku::new(&self.sku)?.into_inner(), title: self.title.trim().to_string(), price: self.price })
    }
}

fn check_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::validation("Price cannot be negative"));
    }
    Ok(())
}

pub async fn product_detail(state: &AppState, id: Uuid) -> AppResult<ProductDetail> {
    let product = products::find(&state.db, id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    let variants = products::variants(&state.db, id).await?;
    Ok(ProductDetail::new(product, variants))
}

pub async fn create_product(state: &AppState, req: ProductRequest) -> AppResult<ProductDetail> {
    let fields = req.fields()?;
    let mut tx = state.db.begin().await?;
    let product = products::insert(&mut *tx, &fields, &state.config.currency, 0)
        .await
        .map_err(AppError::unique(format!("SKU {}", fields.sku)))?;
    receive_initial(&mut tx, StockUnit::Product(product.id), product.id, req.initial_stock).await?;
    tx.commit().await?;
    tracing::info!(sku = %fields.sku, initial_stock = req.initial_stock, "Product created");
    product_detail(state, product.id).await
}

pub async fn update_product(state: &AppState, id: Uuid, req: ProductRequest) -> AppResult<ProductDetail> {
    let fields = req.fields()?;
    products::update(&state.db, id, &fields)
        .await
        .map_err(AppError::unique(format!("SKU {}", fields.sku)))?
        .ok_or_else(|| AppError::not_found("Product"))?;
    product_detail(state, id).await
}

pub async fn add_variant(state: &AppState, product_id: Uuid, req: VariantRequest) -> AppResult<ProductVariant> {
    let fields = req.fields()?;
    let mut tx = state.db.begin().await?;
    products::find(&mut *tx, product_id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    let variant = products::insert_variant(&mut *tx, product_id, &fields, 0)
        .await
        .map_err(AppError::unique(format!("SKU {}", fields.sku)))?;
    receive_initial(&mut tx, StockUnit::Variant(variant.id), product_id, req.initial_stock).await?;
    let variant = products::find_variant(&mut *tx, variant.id).await?.ok_or_else(|| AppError::not_found("Variant"))?;
    tx.commit().await?;
    tracing::info!(sku = %fields.sku, %product_id, "Variant added");
    Ok(variant)
}

pub async fn update_variant(state: &AppState, product_id: Uuid, variant_id: Uuid, req: VariantRequest) -> AppResult<ProductVariant> {
    let fields = req.fields()?;
    products::update_variant(&state.db, product_id, variant_id, &fields)
        .await
        .map_err(AppError::unique(format!("SKU {}", fields.sku)))?
        .ok_or_else(|| AppError::not_found("Variant"))
}

async fn receive_initial(conn: &mut sqlx::PgConnection, unit: StockUnit, product_id: Uuid, quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Ok(());
    }
    let movement = inventory::NewMovement {
        product_id,
        variant_id: unit.variant_id(),
        movement_type: MovementType::Receive,
        quantity,
        previous_quantity: 0,
        new_quantity: quantity,
        reason: Some("Initial stock"),
        reference: None,
    };
    inventory::apply_movement(conn, unit, StockLevel::new(quantity, 0), &movement).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProductRequest {
        ProductRequest {
            sku: " tent-2p ".into(),
            name: "Ridgeline 2P Tent".into(),
            description: None,
            price: Decimal::new(89900, 2),
            status: ProductStatus::Active,
            images: vec![],
            tags: vec![" Camping ".into(), "".into()],
            initial_stock: 5,
        }
    }

    #[test]
    fn test_fields_normalize_sku_and_tags() {
        let fields = request().fields().unwrap();
        assert_eq!(fields.sku, "TENT-2P");
        assert_eq!(fields.tags, vec!["camping".to_string()]);
    }

    #[test]
    fn test_negative_price_and_stock_rejected() {
        let mut req = request();
        req.price = Decimal::new(-1, 0);
        assert!(matches!(req.fields(), Err(AppError::Validation(_))));
        let mut req = request();
        req.initial_stock = -3;
        assert!(matches!(req.fields(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_blank_sku_rejected() {
        let mut req = request();
        req.sku = "  ".into();
        assert!(matches!(req.fields(), Err(AppError::Validation(_))));
    }
}
