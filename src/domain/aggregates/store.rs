//! Physical stores and pickup locations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Store {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Store id on the POS side; inventory sync reads levels for this store.
    pub pos_store_id: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollectionPoint {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub store_id: Option<Uuid>,
    pub opening_hours: Option<String>,
    pub instructions: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upper-cased, whitespace-free store code.
pub fn normalize_store_code(code: &str) -> String {
    code.split_whitespace().collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_store_code_normalized() { assert_eq!(normalize_store_code(" kl sentral "), "KLSENTRAL"); }
}
