//! HTTP routes
//!
//! - `/health`
//! - `/api/v1/...` storefront (public)
//! - `/api/v1/admin/...` back-office (bearer token)
//! - `/webhooks/payment` gateway callbacks (signature-verified, raw body)

pub mod admin;
pub mod auth;
pub mod health;
pub mod storefront;
pub mod webhooks;

use axum::routing::{delete, get, post};
use axum::{middleware, Json, Router};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{ApiResponse, AppResult};
use crate::state::AppState;

pub type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

/// Paginated list payload.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/products", get(storefront::list_products))
        .route("/products/:id", get(storefront::get_product))
        .route("/collection-points", get(storefront::list_collection_points))
        .route("/promos/validate", post(storefront::validate_promo))
        .route(
            "/cart/:session",
            get(storefront::get_cart).post(storefront::add_to_cart).put(storefront::update_cart_item).delete(storefront::clear_cart),
        )
        .route("/cart/:session/items/:product_id", delete(storefront::remove_cart_item))
        .route("/checkout", post(storefront::checkout))
        .route("/orders/:order_number", get(storefront::get_order))
        .route("/orders/:order_number/tracking", get(storefront::track_order));

    let admin = admin::routes().layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/webhooks/payment", post(webhooks::payment_webhook))
        .nest("/api/v1", public.nest("/admin", admin))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
