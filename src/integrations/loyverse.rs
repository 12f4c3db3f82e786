//! Loyverse POS client
//!
//! Only the two read endpoints inventory sync needs: the item catalog (to map
//! POS variant ids to SKUs) and per-store inventory levels. Both are cursor
//! paginated.

use serde::Deserialize;
use std::collections::HashMap;

use super::{check_status, IntegrationError};
use crate::config::PosConfig;

const SERVICE: &str = "POS";
const PAGE_SIZE: u32 = 250;

#[derive(Clone)]
pub struct LoyverseClient {
    http: reqwest::Client,
    config: PosConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemsPage {
    pub items: Vec<PosItem>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PosItem {
    pub id: String,
    pub item_name: String,
    #[serde(default)]
    pub variants: Vec<PosVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PosVariant {
    pub variant_id: String,
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryPage {
    pub inventory_levels: Vec<InventoryLevel>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryLevel {
    pub variant_id: String,
    pub store_id: String,
    /// Loyverse reports fractional stock for weighed items.
    pub in_stock: f64,
}

impl LoyverseClient {
    pub fn new(http: reqwest::Client, config: PosConfig) -> Self {
        Self { http, config }
    }

    /// POS variant id -> SKU for every variant that has one.
    pub async fn variant_skus(&self) -> Result<HashMap<String, String>, IntegrationError> {
        let mut skus = HashMap::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: ItemsPage = self.get_page("items", &[], cursor.as_deref()).await?;
            for variant in page.items.into_iter().flat_map(|i| i.variants) {
                if let Some(sku) = variant.sku.filter(|s| !s.trim().is_empty()) {
                    skus.insert(variant.variant_id, sku);
                }
            }
            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(skus)
    }

    pub async fn inventory_levels(&self, store_id: &str) -> Result<Vec<InventoryLevel>, IntegrationError> {
        let mut levels = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: InventoryPage = self.get_page("inventory", &[("store_ids", store_id)], cursor.as_deref()).await?;
            levels.extend(page.inventory_levels.into_iter().filter(|l| l.store_id == store_id));
            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        tracing::debug!(store_id, count = levels.len(), "Fetched POS inventory levels");
        Ok(levels)
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
        cursor: Option<&str>,
    ) -> Result<T, IntegrationError> {
        let limit = PAGE_SIZE.to_string();
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("limit", limit.as_str()));
        if let Some(c) = cursor {
            query.push(("cursor", c));
        }
        let resp = self
            .http
            .get(format!("{}/v1.0/{resource}", self.config.api_url.trim_end_matches('/')))
            .bearer_auth(&self.config.access_token)
            .query(&query)
            .send()
            .await
            .map_err(IntegrationError::http(SERVICE))?;
        check_status(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::Decode { service: SERVICE, detail: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_page_parses_variants() {
        let page: ItemsPage = serde_json::from_str(
            r#"{"items":[{"id":"i1","item_name":"Trail Runner","variants":[{"variant_id":"v1","sku":"SHOE-TR-42"},{"variant_id":"v2","sku":null}]}],"cursor":"abc"}"#,
        )
        .unwrap();
        assert_eq!(page.items[0].variants.len(), 2);
        assert_eq!(page.cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_inventory_page_parses_fractional_stock() {
        let page: InventoryPage = serde_json::from_str(
            r#"{"inventory_levels":[{"variant_id":"v1","store_id":"s1","in_stock":4.0,"updated_at":"2026-10-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(page.inventory_levels[0].in_stock, 4.0);
        assert!(page.cursor.is_none());
    }
}
