//! Back-office API, mounted under `/api/v1/admin` behind [`super::auth::require_admin`].

mod catalog;
mod consignments;
mod inventory;
mod orders;
mod promos;
mod stores;

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/products", get(catalog::list).post(catalog::create))
        .route("/products/:id", get(catalog::get).put(catalog::update).delete(catalog::archive))
        .route("/products/:id/variants", post(catalog::add_variant))
        .route("/products/:id/variants/:variant_id", put(catalog::update_variant))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/release-expired", post(orders::release_expired))
        .route("/orders/:id", get(orders::get))
        .route("/orders/:id/tracking", get(orders::track))
        .route("/orders/:id/ship", post(orders::ship))
        .route("/orders/:id/ready", post(orders::ready_for_collection))
        .route("/orders/:id/collect", post(orders::collected))
        .route("/orders/:id/deliver", post(orders::delivered))
        .route("/orders/:id/cancel", post(orders::cancel))
        .route("/orders/:id/refund", post(orders::refund))
        // Inventory
        .route("/stock-movements", get(inventory::list).post(inventory::record))
        .route("/stock-movements/archived", get(inventory::list_archived))
        .route("/stock-movements/archive", post(inventory::archive))
        .route("/stock-movements/restore", post(inventory::restore))
        .route("/inventory/sync", post(inventory::sync_pos))
        // Stores and pickup
        .route("/stores", get(stores::list).post(stores::create))
        .route("/stores/:id", get(stores::get).put(stores::update))
        .route("/stores/:id/default", post(stores::make_default))
        .route("/collection-points", get(stores::list_points).post(stores::create_point))
        .route("/collection-points/:id", put(stores::update_point).delete(stores::deactivate_point))
        // Promos
        .route("/promos", get(promos::list).post(promos::create))
        .route("/promos/:id", get(promos::get).put(promos::update).delete(promos::deactivate))
        // Consignments
        .route("/consignments", get(consignments::list).post(consignments::create))
        .route("/consignments/:id", get(consignments::get))
        .route("/consignments/:id/sales", post(consignments::record_sales))
        .route("/consignments/:id/returns", post(consignments::record_returns))
        .route("/consignments/:id/settle", post(consignments::settle))
        .route("/consignments/:id/cancel", post(consignments::cancel))
}
