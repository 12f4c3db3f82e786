//! Public storefront API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiResult, Paginated};
use crate::db::{self, products::ProductFilter, Page};
use crate::domain::aggregates::{normalize_code, CartItem, CollectionPoint, ProductDetail, ProductStatus, PromoDiscount};
use crate::error::{ApiResponse, AppError};
use crate::integrations::parcel::TrackingInfo;
use crate::services::{
    cart::{self, CartView, QuantityUpdate},
    catalog,
    checkout::{self, CheckoutRequest, CheckoutResult},
    orders::{self, OrderDetail},
    tracking,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

/// GET /api/v1/products - active products only
pub async fn list_products(State(state): State<AppState>, Query(q): Query<ProductQuery>) -> ApiResult<Paginated<ProductDetail>> {
    let page = Page::new(q.page, q.per_page);
    let filter = ProductFilter {
        search: q.search.filter(|s| !s.trim().is_empty()),
        tag: q.tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()),
        status: Some(ProductStatus::Active),
    };
    let (products, total) = db::products::list(&state.db, &filter, page).await?;

    let mut items = Vec::with_capacity(products.len());
    for product in products {
        let variants = db::products::variants(&state.db, product.id).await?;
        items.push(ProductDetail::new(product, variants));
    }
    Ok(ApiResponse::ok(Paginated { items, total, page: page.page, per_page: page.per_page }))
}

/// GET /api/v1/products/:id
pub async fn get_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ProductDetail> {
    let detail = catalog::product_detail(&state, id).await?;
    if !detail.product.is_purchasable() {
        return Err(AppError::not_found("Product"));
    }
    Ok(ApiResponse::ok(detail))
}

/// GET /api/v1/collection-points
pub async fn list_collection_points(State(state): State<AppState>) -> ApiResult<Vec<CollectionPoint>> {
    let points = db::collection_points::list(&state.db, true).await?;
    Ok(ApiResponse::ok(points))
}

#[derive(Debug, Deserialize)]
pub struct PromoCheck {
    pub code: String,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PromoQuote {
    pub code: String,
    #[serde(flatten)]
    pub discount: PromoDiscount,
}

/// POST /api/v1/promos/validate
pub async fn validate_promo(State(state): State<AppState>, Json(req): Json<PromoCheck>) -> ApiResult<PromoQuote> {
    let code = normalize_code(&req.code);
    let promo = db::promos::find_by_code(&state.db, &code).await?.ok_or_else(|| AppError::not_found("Promo code"))?;
    let discount = promo.evaluate(req.subtotal, Utc::now())?;
    Ok(ApiResponse::ok(PromoQuote { code, discount }))
}

/// GET /api/v1/cart/:session
pub async fn get_cart(State(state): State<AppState>, Path(session): Path<String>) -> ApiResult<CartView> {
    Ok(ApiResponse::ok(cart::view(&state, &session).await?))
}

/// POST /api/v1/cart/:session
pub async fn add_to_cart(State(state): State<AppState>, Path(session): Path<String>, Json(item): Json<CartItem>) -> ApiResult<CartView> {
    Ok(ApiResponse::ok(cart::add(&state, &session, item).await?))
}

/// PUT /api/v1/cart/:session
pub async fn update_cart_item(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Json(update): Json<QuantityUpdate>,
) -> ApiResult<CartView> {
    Ok(ApiResponse::ok(cart::set_quantity(&state, &session, update).await?))
}

#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    pub variant_id: Option<Uuid>,
}

/// DELETE /api/v1/cart/:session/items/:product_id
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((session, product_id)): Path<(String, Uuid)>,
    Query(q): Query<VariantQuery>,
) -> ApiResult<CartView> {
    Ok(ApiResponse::ok(cart::remove(&state, &session, product_id, q.variant_id).await?))
}

/// DELETE /api/v1/cart/:session
pub async fn clear_cart(State(state): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, AppError> {
    cart::clear(&state, &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/checkout
pub async fn checkout(State(state): State<AppState>, Json(req): Json<CheckoutRequest>) -> Result<(StatusCode, Json<ApiResponse<CheckoutResult>>), AppError> {
    let result = checkout::place_order(&state, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(result)))
}

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub email: String,
}

/// GET /api/v1/orders/:order_number?email=
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Query(q): Query<CustomerQuery>,
) -> ApiResult<OrderDetail> {
    Ok(ApiResponse::ok(orders::detail_for_customer(&state, &order_number, &q.email).await?))
}

/// GET /api/v1/orders/:order_number/tracking?email=
pub async fn track_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    Query(q): Query<CustomerQuery>,
) -> ApiResult<Option<TrackingInfo>> {
    let detail = orders::detail_for_customer(&state, &order_number, &q.email).await?;
    Ok(ApiResponse::ok(tracking::track_order(&state, &detail.order).await?))
}
