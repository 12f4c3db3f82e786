use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::ApiResult;
use crate::db::{self, promos::PromoFields};
use crate::domain::aggregates::{normalize_code, validate_value, Promo, PromoKind};
use crate::error::{ApiResponse, AppError, AppResult};
use crate::state::AppState;

fn active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PromoRequest {
    #[validate(length(min = 3, max = 40))]
    pub code: String,
    #[validate(length(max = 300))]
    pub description: Option<String>,
    pub kind: PromoKind,
    #[serde(default)]
    pub value: Decimal,
    pub min_spend: Option<Decimal>,
    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl PromoRequest {
    fn fields(&self) -> AppResult<PromoFields> {
        self.validate()?;
        validate_value(self.kind, self.value)?;
        if self.min_spend.is_some_and(|m| m < Decimal::ZERO) {
            return Err(AppError::validation("Minimum spend cannot be negative"));
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if end <= start {
                return Err(AppError::validation("Promo must end after it starts"));
            }
        }
        Ok(PromoFields {
            code: normalize_code(&self.code),
            description: self.description.clone(),
            kind: self.kind,
            value: self.value,
            min_spend: self.min_spend,
            max_uses: self.max_uses,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            is_active: self.is_active,
        })
    }
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Promo>> {
    Ok(ApiResponse::ok(db::promos::list(&state.db).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Promo> {
    let promo = db::promos::find(&state.db, id).await?.ok_or_else(|| AppError::not_found("Promo"))?;
    Ok(ApiResponse::ok(promo))
}

pub async fn create(State(state): State<AppState>, Json(req): Json<PromoRequest>) -> Result<(StatusCode, Json<ApiResponse<Promo>>), AppError> {
    let fields = req.fields()?;
    let promo = db::promos::insert(&state.db, &fields)
        .await
        .map_err(AppError::unique(format!("Promo {}", fields.code)))?;
    tracing::info!(code = %promo.code, kind = promo.kind.as_str(), "Promo created");
    Ok((StatusCode::CREATED, ApiResponse::ok(promo)))
}

pub async fn update(State(state): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<PromoRequest>) -> ApiResult<Promo> {
    let fields = req.fields()?;
    let promo = db::promos::update(&state.db, id, &fields)
        .await
        .map_err(AppError::unique(format!("Promo {}", fields.code)))?
        .ok_or_else(|| AppError::not_found("Promo"))?;
    Ok(ApiResponse::ok(promo))
}

/// DELETE /admin/promos/:id - deactivates; used counts stay for reporting
pub async fn deactivate(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    if !db::promos::deactivate(&state.db, id).await? {
        return Err(AppError::not_found("Promo"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> PromoRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_code_uppercased() {
        let fields = request(json!({"code": " summit10 ", "kind": "PERCENTAGE", "value": "10"})).fields().unwrap();
        assert_eq!(fields.code, "SUMMIT10");
        assert!(fields.is_active);
    }

    #[test]
    fn test_percentage_over_hundred_rejected() {
        let req = request(json!({"code": "HALFOFF", "kind": "PERCENTAGE", "value": "150"}));
        assert!(matches!(req.fields(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_window_must_be_ordered() {
        let req = request(json!({
            "code": "WINTER",
            "kind": "FREE_SHIPPING",
            "starts_at": "2026-12-01T00:00:00Z",
            "ends_at": "2026-11-01T00:00:00Z",
        }));
        assert!(matches!(req.fields(), Err(AppError::Validation(_))));
    }
}
