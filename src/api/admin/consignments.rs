use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ApiResult;
use crate::db;
use crate::domain::aggregates::{Consignment, ConsignmentDetail, ConsignmentStatus};
use crate::error::{ApiResponse, AppError};
use crate::services::consignments::{self, CountsRequest, CreateConsignment};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConsignmentQuery {
    pub status: Option<ConsignmentStatus>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<ConsignmentQuery>) -> ApiResult<Vec<Consignment>> {
    Ok(ApiResponse::ok(db::consignments::list(&state.db, q.status).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ConsignmentDetail> {
    Ok(ApiResponse::ok(consignments::detail(&state, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateConsignment>,
) -> Result<(StatusCode, Json<ApiResponse<ConsignmentDetail>>), AppError> {
    let detail = consignments::create(&state, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(detail)))
}

pub async fn record_sales(State(state): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<CountsRequest>) -> ApiResult<ConsignmentDetail> {
    Ok(ApiResponse::ok(consignments::record_sales(&state, id, req).await?))
}

pub async fn record_returns(State(state): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<CountsRequest>) -> ApiResult<ConsignmentDetail> {
    Ok(ApiResponse::ok(consignments::record_returns(&state, id, req).await?))
}

pub async fn settle(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ConsignmentDetail> {
    Ok(ApiResponse::ok(consignments::settle(&state, id).await?))
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ConsignmentDetail> {
    Ok(ApiResponse::ok(consignments::cancel(&state, id).await?))
}
