//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::StockLevel;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub stock_quantity: i32,
    pub reserved_quantity: i32,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub title: String,
    pub price: Option<Decimal>,
    pub stock_quantity: i32,
    pub reserved_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "DRAFT", Self::Active => "ACTIVE", Self::Archived => "ARCHIVED" }
    }
}

impl TryFrom<String> for ProductStatus {
    type Error = ProductError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(ProductError::UnknownStatus(value)),
        }
    }
}

impl Product {
    pub fn stock(&self) -> StockLevel { StockLevel::new(self.stock_quantity, self.reserved_quantity) }
    pub fn is_purchasable(&self) -> bool { self.status == ProductStatus::Active }
}

impl ProductVariant {
    pub fn stock(&self) -> StockLevel { StockLevel::new(self.stock_quantity, self.reserved_quantity) }

    /// Variant price override, falling back to the parent product's price.
    pub fn unit_price(&self, product: &Product) -> Decimal { self.price.unwrap_or(product.price) }
}

/// Product with its variants and the quantities a shopper can still buy.
#[derive(Clone, Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub available: i32,
    pub variants: Vec<VariantDetail>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VariantDetail {
    #[serde(flatten)]
    pub variant: ProductVariant,
    pub available: i32,
    pub unit_price: Decimal,
}

impl ProductDetail {
    pub fn new(product: Product, variants: Vec<ProductVariant>) -> Self {
        let variants = variants
            .into_iter()
            .map(|v| VariantDetail { available: v.stock().available(), unit_price: v.unit_price(&product), variant: v })
            .collect::<Vec<_>>();
        // A product sold through variants is as available as the sum of its variants.
        let available = if variants.is_empty() {
            product.stock().available()
        } else {
            variants.iter().map(|v| v.available).sum()
        };
        Self { product, available, variants }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { UnknownStatus(String) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::UnknownStatus(s) => write!(f, "Unknown product status: {s}") }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(stock: i32, reserved: i32) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::now_v7(), sku: "TENT-2P".into(), name: "Ridgeline 2P Tent".into(), description: None,
            price: Decimal::new(59900, 2), currency: "MYR".into(), stock_quantity: stock, reserved_quantity: reserved,
            status: ProductStatus::Active, images: vec![], tags: vec!["tents".into()], created_at: now, updated_at: now,
        }
    }

    pub(crate) fn variant(product: &Product, sku: &str, stock: i32, price: Option<Decimal>) -> ProductVariant {
        ProductVariant {
            id: Uuid::now_v7(), product_id: product.id, sku: sku.into(), title: sku.into(), price,
            stock_quantity: stock, reserved_quantity: 0, created_at: product.created_at, updated_at: product.updated_at,
        }
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for s in [ProductStatus::Draft, ProductStatus::Active, ProductStatus::Archived] {
            assert_eq!(ProductStatus::try_from(s.as_str().to_string()).unwrap(), s);
        }
        assert!(ProductStatus::try_from("deleted".to_string()).is_err());
    }

    #[test]
    fn test_detail_sums_variant_availability() {
        let p = product(0, 0);
        let v1 = variant(&p, "TENT-2P-GRN", 3, None);
        let v2 = variant(&p, "TENT-2P-ORG", 2, Some(Decimal::new(62900, 2)));
        let detail = ProductDetail::new(p, vec![v1, v2]);
        assert_eq!(detail.available, 5);
        assert_eq!(detail.variants[0].unit_price, Decimal::new(59900, 2));
        assert_eq!(detail.variants[1].unit_price, Decimal::new(62900, 2));
    }

    #[test]
    fn test_detail_without_variants_uses_product_stock() {
        let detail = ProductDetail::new(product(10, 4), vec![]);
        assert_eq!(detail.available, 6);
    }
}
