//! Basecamp Store
//!
//! Storefront and back-office service for an outdoor-gear retailer.
//!
//! ## Features
//! - Product catalog with variants
//! - Session carts and checkout with stock reservation
//! - Payment gateway bills and signed webhooks
//! - Order fulfilment: shipping, pickup at collection points, refunds
//! - Stock movement ledger with archiving
//! - POS inventory sync, promo codes, consignments
//! - Parcel tracking

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod integrations;
pub mod services;
pub mod state;

pub use api::create_router;
pub use config::Config;
pub use error::{ApiResponse, AppError, AppResult};
pub use state::AppState;
