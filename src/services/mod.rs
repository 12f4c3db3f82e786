//! Multi-step operations behind the HTTP handlers.
//!
//! Handlers call `db` directly for plain reads and single-row writes; anything
//! that spans several statements, a transaction or an outbound call lives here.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod consignments;
pub mod events;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod pos_sync;
pub mod tracking;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::{products, StockUnit};
use crate::domain::aggregates::{Product, ProductVariant};
use crate::domain::value_objects::StockLevel;
use crate::error::{AppError, AppResult};

/// A product, or one of its variants, resolved from ids a client sent.
#[derive(Debug, Clone)]
pub struct SellableUnit {
    pub product: Product,
    pub variant: Option<ProductVariant>,
}

impl SellableUnit {
    pub async fn load(conn: &mut PgConnection, product_id: Uuid, variant_id: Option<Uuid>) -> AppResult<Self> {
        let product = products::find(&mut *conn, product_id).await?.ok_or_else(|| AppError::not_found("Product"))?;
        let variant = match variant_id {
            Some(id) => {
                let variant = products::find_variant(&mut *conn, id).await?;
                Some(variant.filter(|v| v.product_id == product_id).ok_or_else(|| AppError::not_found("Variant"))?)
            }
            None => None,
        };
        Ok(Self { product, variant })
    }

    pub fn unit(&self) -> StockUnit {
        StockUnit::new(self.product.id, self.variant.as_ref().map(|v| v.id))
    }

    pub fn sku(&self) -> &str {
        self.variant.as_ref().map_or(&self.product.sku, |v| &v.sku)
    }

    pub fn name(&self) -> String {
        match &self.variant {
            Some(v) => format!("{} ({})", self.product.name, v.title),
            None => self.product.name.clone(),
        }
    }

    pub fn unit_price(&self) -> rust_decimal::Decimal {
        self.variant.as_ref().map_or(self.product.price, |v| v.unit_price(&self.product))
    }

    pub fn stock(&self) -> StockLevel {
        self.variant.as_ref().map_or_else(|| self.product.stock(), ProductVariant::stock)
    }
}
