//! POS inventory sync
//!
//! The POS is the source of truth for on-hand counts. A sync pulls the POS
//! catalog and the default store's levels, matches them to local SKUs and
//! overwrites `stock_quantity`, recording every change as an ADJUST movement.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::db::{self, inventory, products::SkuStock, StockUnit};
use crate::domain::aggregates::MovementType;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::StockLevel;
use crate::error::{AppError, AppResult};
use crate::integrations::loyverse::InventoryLevel;
use crate::state::AppState;

pub const SYNC_REFERENCE: &str = "pos-sync";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub sku: String,
    pub product_id: Uuid,
    pub unit: StockUnit,
    pub previous: i32,
    pub new: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub updates: Vec<StockUpdate>,
    pub unchanged: usize,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub updated: usize,
    pub unchanged: usize,
    pub unmatched: Vec<String>,
}

/// Pairs POS variants with their SKU, keeping only levels for `store_id`.
pub fn pos_counts(variant_skus: &HashMap<String, String>, levels: &[InventoryLevel], store_id: &str) -> Vec<(String, f64)> {
    levels
        .iter()
        .filter(|l| l.store_id == store_id)
        .filter_map(|l| variant_skus.get(&l.variant_id).map(|sku| (sku.clone(), l.in_stock)))
        .collect()
}

/// Decides what a sync would change. Variant SKUs win over product SKUs.
pub fn plan_sync(catalog: &[SkuStock], counts: &[(String, f64)]) -> SyncPlan {
    let mut variants = HashMap::new();
    let mut products = HashMap::new();
    for entry in catalog {
        let index = match entry.unit {
            StockUnit::Variant(_) => &mut variants,
            StockUnit::Product(_) => &mut products,
        };
        index.insert(entry.sku.trim().to_uppercase(), entry);
    }

    let mut plan = SyncPlan::default();
    let mut seen = HashSet::new();
    for (sku, count) in counts {
        let key = sku.trim().to_uppercase();
        if key.is_empty() || !seen.insert(key.clone()) {
            continue;
        }
        let Some(entry) = variants.get(&key).or_else(|| products.get(&key)) else {
            plan.unmatched.push(key);
            continue;
        };
        // `as` saturates and maps NaN to 0
        let new = count.max(0.0).round() as i32;
        if new == entry.stock_quantity {
            plan.unchanged += 1;
        } else {
            plan.updates.push(StockUpdate { sku: entry.sku.clone(), product_id: entry.product_id, unit: entry.unit, previous: entry.stock_quantity, new });
        }
    }
    plan
}

pub async fn sync(state: &AppState) -> AppResult<SyncReport> {
    let store = db::stores::default_store(&state.db).await?.ok_or_else(|| AppError::rule("No default store is set"))?;
    let pos_store_id = store
        .pos_store_id
        .clone()
        .ok_or_else(|| AppError::rule(format!("Store {} has no POS store id", store.code)))?;

    let (variant_skus, levels) = futures::try_join!(state.pos.variant_skus(), state.pos.inventory_levels(&pos_store_id))?;
    let counts = pos_counts(&variant_skus, &levels, &pos_store_id);
    let catalog = db::products::sku_index(&state.db).await?;
    let plan = plan_sync(&catalog, &counts);

    let mut tx = state.db.begin().await?;
    let mut updated = 0;
    for update in &plan.updates {
        let Some(level) = inventory::lock_level(&mut *tx, update.unit).await? else { continue };
        if level.on_hand == update.new {
            continue;
        }
        let movement = inventory::NewMovement {
            product_id: update.product_id,
            variant_id: update.unit.variant_id(),
            movement_type: MovementType::Adjust,
            quantity: update.new - level.on_hand,
            previous_quantity: level.on_hand,
            new_quantity: update.new,
            reason: Some("POS inventory sync"),
            reference: Some(SYNC_REFERENCE),
        };
        inventory::apply_movement(&mut tx, update.unit, StockLevel { on_hand: update.new, ..level }, &movement).await?;
        updated += 1;
    }
    tx.commit().await?;

    let unchanged = plan.unchanged + (plan.updates.len() - updated);
    tracing::info!(store = %store.code, updated, unchanged, unmatched = plan.unmatched.len(), "POS inventory synced");
    if !plan.unmatched.is_empty() {
        tracing::warn!(skus = ?plan.unmatched, "POS SKUs with no local match");
    }
    state.events.publish(DomainEvent::InventorySynced { updated, unmatched: plan.unmatched.len() }).await;

    Ok(SyncReport { updated, unchanged, unmatched: plan.unmatched })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sku: &str, unit: StockUnit, stock: i32) -> SkuStock {
        SkuStock { sku: sku.into(), product_id: Uuid::now_v7(), unit, stock_quantity: stock }
    }

    #[test]
    fn test_variant_sku_wins_over_product() {
        let variant = Uuid::now_v7();
        let catalog = vec![
            entry("TENT-2P", StockUnit::Product(Uuid::now_v7()), 4),
            entry("TENT-2P", StockUnit::Variant(variant), 4),
        ];
        let plan = plan_sync(&catalog, &[("tent-2p".into(), 9.0)]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].unit, StockUnit::Variant(variant));
        assert_eq!((plan.updates[0].previous, plan.updates[0].new), (4, 9));
    }

    #[test]
    fn test_negative_counts_clamp_and_unchanged_skipped() {
        let catalog = vec![
            entry("STOVE-01", StockUnit::Product(Uuid::now_v7()), 3),
            entry("MUG-TI", StockUnit::Product(Uuid::now_v7()), 0),
        ];
        let plan = plan_sync(&catalog, &[("STOVE-01".into(), -2.0), ("MUG-TI".into(), -1.0), ("GHOST".into(), 5.0)]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].new, 0);
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.unmatched, vec!["GHOST".to_string()]);
    }

    #[test]
    fn test_pos_counts_filters_store() {
        let skus = HashMap::from([("v1".to_string(), "STOVE-01".to_string())]);
        let levels = vec![
            InventoryLevel { variant_id: "v1".into(), store_id: "s1".into(), in_stock: 7.0 },
            InventoryLevel { variant_id: "v1".into(), store_id: "s2".into(), in_stock: 1.0 },
            InventoryLevel { variant_id: "v9".into(), store_id: "s1".into(), in_stock: 2.0 },
        ];
        assert_eq!(pos_counts(&skus, &levels, "s1"), vec![("STOVE-01".to_string(), 7.0)]);
    }
}
