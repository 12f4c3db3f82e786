use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiResult, Paginated};
use crate::db::{self, products::ProductFilter, Page};
use crate::domain::aggregates::{Product, ProductDetail, ProductStatus, ProductVariant};
use crate::error::{ApiResponse, AppError};
use crate::services::catalog::{self, ProductRequest, VariantRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminProductQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub tag: Option<String>,
    pub status: Option<ProductStatus>,
}

/// GET /admin/products - every status unless filtered
pub async fn list(State(state): State<AppState>, Query(q): Query<AdminProductQuery>) -> ApiResult<Paginated<Product>> {
    let page = Page::new(q.page, q.per_page);
    let filter = ProductFilter {
        search: q.search.filter(|s| !s.trim().is_empty()),
        tag: q.tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()),
        status: q.status,
    };
    let (items, total) = db::products::list(&state.db, &filter, page).await?;
    Ok(ApiResponse::ok(Paginated { items, total, page: page.page, per_page: page.per_page }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ProductDetail> {
    Ok(ApiResponse::ok(catalog::product_detail(&state, id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductDetail>>), AppError> {
    let detail = catalog::create_product(&state, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(detail)))
}

pub async fn update(State(state): State<AppState>, Path(id): Path<Uuid>, Json(req): Json<ProductRequest>) -> ApiResult<ProductDetail> {
    Ok(ApiResponse::ok(catalog::update_product(&state, id, req).await?))
}

/// DELETE /admin/products/:id - archives; order history keeps pointing at the row
pub async fn archive(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    if !db::products::archive(&state.db, id).await? {
        return Err(AppError::not_found("Product"));
    }
    tracing::info!(product_id = %id, "Product archived");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<VariantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductVariant>>), AppError> {
    let variant = catalog::add_variant(&state, id, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(variant)))
}

pub async fn update_variant(
    State(state): State<AppState>,
    Path((id, variant_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<VariantRequest>,
) -> ApiResult<ProductVariant> {
    Ok(ApiResponse::ok(catalog::update_variant(&state, id, variant_id, req).await?))
}
