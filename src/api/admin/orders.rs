use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ApiResult, Paginated};
use crate::db::{self, Page};
use crate::domain::aggregates::{Order, OrderStatus};
use crate::error::{ApiResponse, AppError};
use crate::integrations::parcel::TrackingInfo;
use crate::services::{
    orders::{self, OrderDetail, RefundRequest, ShipRequest},
    payments, tracking,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<OrderQuery>) -> ApiResult<Paginated<Order>> {
    let page = Page::new(q.page, q.per_page);
    let (items, total) = db::orders::list(&state.db, q.status, page).await?;
    Ok(ApiResponse::ok(Paginated { items, total, page: page.page, per_page: page.per_page }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<OrderDetail> {
    Ok(ApiResponse::ok(orders::detail(&state, id).await?))
}

pub async fn track(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Option<TrackingInfo>> {
    let order = db::orders::find(&state.db, id).await?.ok_or_else(|| AppError::not_found("Order"))?;
    Ok(ApiResponse::ok(tracking::track_order(&state, &order).await?))
}

pub async fn ship(State(state): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<ShipRequest>) -> ApiResult<Order> {
    Ok(ApiResponse::ok(orders::ship(&state, id, req).await?))
}

pub async fn ready_for_collection(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Order> {
    Ok(ApiResponse::ok(orders::advance(&state, id, OrderStatus::ReadyForCollection).await?))
}

pub async fn collected(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Order> {
    Ok(ApiResponse::ok(orders::advance(&state, id, OrderStatus::Collected).await?))
}

pub async fn delivered(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Order> {
    Ok(ApiResponse::ok(orders::advance(&state, id, OrderStatus::Delivered).await?))
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Order> {
    Ok(ApiResponse::ok(orders::cancel(&state, id).await?))
}

/// POST /admin/orders/:id/refund - body optional, `{"restock": true}` puts units back
pub async fn refund(State(state): State<AppState>, Path(id): Path<Uuid>, req: Option<Json<RefundRequest>>) -> ApiResult<Order> {
    let req = req.map(|Json(r)| r).unwrap_or_default();
    Ok(ApiResponse::ok(orders::refund(&state, id, req).await?))
}

#[derive(Debug, Serialize)]
pub struct Released {
    pub released: usize,
}

/// POST /admin/orders/release-expired
pub async fn release_expired(State(state): State<AppState>) -> ApiResult<Released> {
    let released = payments::release_expired(&state).await?;
    Ok(ApiResponse::ok(Released { released }))
}
