//! Stores and collection points

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::ApiResult;
use crate::db::{
    self,
    collection_points::CollectionPointFields,
    stores::StoreFields,
};
use crate::domain::aggregates::{normalize_store_code, CollectionPoint, Store};
use crate::error::{ApiResponse, AppError, AppResult};
use crate::state::AppState;

fn active() -> bool {
    true
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StoreRequest {
    #[validate(length(min = 2, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 64))]
    pub pos_store_id: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl StoreRequest {
    fn fields(&self) -> AppResult<StoreFields> {
        self.validate()?;
        let code = normalize_store_code(&self.code);
        if code.is_empty() {
            return Err(AppError::validation("Store code cannot be blank"));
        }
        Ok(StoreFields {
            code,
            name: self.name.trim().to_string(),
            address: trimmed(&self.address),
            phone: trimmed(&self.phone),
            pos_store_id: trimmed(&self.pos_store_id),
            is_active: self.is_active,
        })
    }
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Store>> {
    Ok(ApiResponse::ok(db::stores::list(&state.db).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Store> {
    let store = db::stores::find(&state.db, id).await?.ok_or_else(|| AppError::not_found("Store"))?;
    Ok(ApiResponse::ok(store))
}

pub async fn create(State(state): State<AppState>, Json(req): Json<StoreRequest>) -> Result<(StatusCode, Json<ApiResponse<Store>>), AppError> {
    let fields = req.fields()?;
    let store = db::stores::insert(&state.db, &fields)
        .await
        .map_err(AppError::unique(format!("Store {}", fields.code)))?;
    tracing::info!(code = %store.code, "Store created");
    Ok((StatusCode::CREATED, ApiResponse::ok(store)))
}

pub async fn update(State(state): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<StoreRequest>) -> ApiResult<Store> {
    let fields = req.fields()?;
    let store = db::stores::update(&state.db, id, &fields)
        .await
        .map_err(AppError::unique(format!("Store {}", fields.code)))?
        .ok_or_else(|| AppError::not_found("Store"))?;
    Ok(ApiResponse::ok(store))
}

/// POST /admin/stores/:id/default - exactly one store is the default at a time
pub async fn make_default(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Store> {
    let mut tx = state.db.begin().await?;
    let store = db::stores::set_default(&mut tx, id)
        .await
        .map_err(AppError::unique("Another default store"))?
        .ok_or_else(|| AppError::not_found("Store"))?;
    tx.commit().await?;
    tracing::info!(code = %store.code, "Default store changed");
    Ok(ApiResponse::ok(store))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CollectionPointRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 300))]
    pub address: String,
    pub store_id: Option<Uuid>,
    #[validate(length(max = 200))]
    pub opening_hours: Option<String>,
    #[validate(length(max = 1000))]
    pub instructions: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

impl CollectionPointRequest {
    async fn fields(&self, state: &AppState) -> AppResult<CollectionPointFields> {
        self.validate()?;
        if let Some(store_id) = self.store_id {
            db::stores::find(&state.db, store_id).await?.ok_or_else(|| AppError::not_found("Store"))?;
        }
        Ok(CollectionPointFields {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            store_id: self.store_id,
            opening_hours: trimmed(&self.opening_hours),
            instructions: trimmed(&self.instructions),
            is_active: self.is_active,
        })
    }
}

/// GET /admin/collection-points - includes inactive ones
pub async fn list_points(State(state): State<AppState>) -> ApiResult<Vec<CollectionPoint>> {
    Ok(ApiResponse::ok(db::collection_points::list(&state.db, false).await?))
}

pub async fn create_point(
    State(state): State<AppState>,
    Json(req): Json<CollectionPointRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CollectionPoint>>), AppError> {
    let fields = req.fields(&state).await?;
    let point = db::collection_points::insert(&state.db, &fields).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(point)))
}

pub async fn update_point(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CollectionPointRequest>,
) -> ApiResult<CollectionPoint> {
    let fields = req.fields(&state).await?;
    let point = db::collection_points::update(&state.db, id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Collection point"))?;
    Ok(ApiResponse::ok(point))
}

pub async fn deactivate_point(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    if !db::collection_points::deactivate(&state.db, id).await? {
        return Err(AppError::not_found("Collection point"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_fields_normalized() {
        let req = StoreRequest {
            code: " kl central ".into(),
            name: " Basecamp KL ".into(),
            address: Some("  ".into()),
            phone: Some(" 03-1234 5678 ".into()),
            pos_store_id: None,
            is_active: true,
        };
        let fields = req.fields().unwrap();
        assert_eq!(fields.code, "KLCENTRAL");
        assert_eq!(fields.name, "Basecamp KL");
        assert_eq!(fields.address, None);
        assert_eq!(fields.phone.as_deref(), Some("03-1234 5678"));
    }

    #[test]
    fn test_store_code_length_checked() {
        let req: StoreRequest = serde_json::from_value(serde_json::json!({"code": "K", "name": "Kiosk"})).unwrap();
        assert!(req.is_active);
        assert!(matches!(req.fields(), Err(AppError::Validation(_))));
    }
}
