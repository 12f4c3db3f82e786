//! PostgreSQL access, one module per table family.
//!
//! Functions that run a single statement take any `PgExecutor` so they work on
//! the pool and inside a transaction. Functions that need several statements
//! take `&mut PgConnection` (pass `&mut *tx`).

pub mod cart;
pub mod collection_points;
pub mod consignments;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod promos;
pub mod shipments;
pub mod stores;
pub mod webhooks;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable unit that carries its own stock counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum StockUnit {
    Product(Uuid),
    Variant(Uuid),
}

impl StockUnit {
    pub fn new(product_id: Uuid, variant_id: Option<Uuid>) -> Self {
        match variant_id {
            Some(v) => Self::Variant(v),
            None => Self::Product(product_id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self { Self::Product(id) | Self::Variant(id) => *id }
    }

    pub fn variant_id(&self) -> Option<Uuid> {
        match self { Self::Variant(id) => Some(*id), Self::Product(_) => None }
    }

    pub(crate) fn table(&self) -> &'static str {
        match self { Self::Product(_) => "products", Self::Variant(_) => "product_variants" }
    }
}

/// 1-based page number and page size, clamped to sane bounds.
#[derive(Clone, Copy, Debug)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page: page.unwrap_or(1).max(1), per_page: per_page.unwrap_or(20).clamp(1, 100) }
    }
    pub fn limit(&self) -> i64 { self.per_page as i64 }
    pub fn offset(&self) -> i64 { ((self.page - 1) * self.per_page) as i64 }
}
