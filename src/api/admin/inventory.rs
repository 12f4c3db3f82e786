use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ApiResult;
use crate::db::{inventory as ledger, Page};
use crate::domain::aggregates::StockMovement;
use crate::error::{ApiResponse, AppError};
use crate::services::{
    inventory::{self, LedgerCount, MovementRequest, RestoreRequest},
    pos_sync::{self, SyncReport},
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub product_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<MovementQuery>) -> ApiResult<Vec<StockMovement>> {
    let page = Page::new(q.page, q.per_page);
    let movements = ledger::list_movements(&state.db, q.product_id, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(movements))
}

pub async fn list_archived(State(state): State<AppState>, Query(q): Query<MovementQuery>) -> ApiResult<Vec<StockMovement>> {
    let page = Page::new(q.page, q.per_page);
    let movements = ledger::list_archived(&state.db, q.product_id, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(movements))
}

pub async fn record(
    State(state): State<AppState>,
    Json(req): Json<MovementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StockMovement>>), AppError> {
    let movement = inventory::record_movement(&state, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(movement)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveRequest {
    pub older_than_days: Option<i64>,
}

/// POST /admin/stock-movements/archive - body optional, defaults to the configured age
pub async fn archive(State(state): State<AppState>, req: Option<Json<ArchiveRequest>>) -> ApiResult<LedgerCount> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    Ok(ApiResponse::ok(inventory::archive(&state, req.older_than_days).await?))
}

pub async fn restore(State(state): State<AppState>, Json(req): Json<RestoreRequest>) -> ApiResult<LedgerCount> {
    Ok(ApiResponse::ok(inventory::restore(&state, req).await?))
}

/// POST /admin/inventory/sync - pull POS counts into the ledger
pub async fn sync_pos(State(state): State<AppState>) -> ApiResult<SyncReport> {
    Ok(ApiResponse::ok(pos_sync::sync(&state).await?))
}
