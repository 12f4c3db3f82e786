//! Error handling at the HTTP boundary
//!
//! Every action answers with the same envelope: `{"success": true, "data": ...}`
//! on success and `{"success": false, "error": "..."}` on failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::aggregates::{CartError, ConsignmentError, OrderError, PromoError, StockError};
use crate::domain::value_objects::SkuError;
use crate::integrations::IntegrationError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data: Some(data), error: None })
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()) }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock { sku: String, requested: i32, available: i32 },

    #[error("{0}")]
    BusinessRule(String),

    #[error("Upstream service error: {0}")]
    Upstream(#[from] IntegrationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self { Self::NotFound(what.into()) }
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
    pub fn rule(msg: impl std::fmt::Display) -> Self { Self::BusinessRule(msg.to_string()) }

    /// Maps a unique-constraint violation to [`AppError::Conflict`], anything else to a database error.
    pub fn unique(what: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Self {
        let what = what.into();
        move |e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                Self::Conflict(what)
            } else {
                Self::Database(e)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InsufficientStock { .. } => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(target: "database", error = %e, "Database error occurred");
                "Database error".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(target: "internal", error = %e, "Internal error occurred");
                "Internal server error".to_string()
            }
            Self::Upstream(e) => {
                tracing::warn!(error = %e, "Upstream call failed");
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

impl From<SkuError> for AppError {
    fn from(e: SkuError) -> Self { Self::Validation(e.to_string()) }
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::NotFound("Cart item".into()),
            CartError::InvalidQuantity => Self::Validation(e.to_string()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::UnknownValue(_) => Self::Internal(e.to_string()),
            _ => Self::rule(e),
        }
    }
}

impl From<StockError> for AppError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::ZeroQuantity | StockError::NonPositiveQuantity(_) => Self::Validation(e.to_string()),
            StockError::UnknownType(_) => Self::Internal(e.to_string()),
            _ => Self::rule(e),
        }
    }
}

impl From<PromoError> for AppError {
    fn from(e: PromoError) -> Self {
        match e {
            PromoError::InvalidValue => Self::Validation(e.to_string()),
            PromoError::UnknownKind(_) => Self::Internal(e.to_string()),
            _ => Self::rule(e),
        }
    }
}

impl From<ConsignmentError> for AppError {
    fn from(e: ConsignmentError) -> Self {
        match e {
            ConsignmentError::InvalidQuantity | ConsignmentError::InvalidCommission => Self::Validation(e.to_string()),
            ConsignmentError::UnknownStatus(_) => Self::Internal(e.to_string()),
            _ => Self::rule(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderStatus;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::not_found("Order").status(), StatusCode::NOT_FOUND);
        let stock = AppError::InsufficientStock { sku: "TENT-2P".into(), requested: 3, available: 1 };
        assert_eq!(stock.status(), StatusCode::CONFLICT);
        assert_eq!(stock.to_string(), "Insufficient stock for TENT-2P: requested 3, available 1");
        let transition: AppError = OrderError::InvalidTransition { from: OrderStatus::Refunded, to: OrderStatus::Paid }.into();
        assert_eq!(transition.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_failure_envelope() {
        let body = serde_json::to_value(ApiResponse::<()>::failure("Order not found")).unwrap();
        assert_eq!(body, serde_json::json!({"success": false, "error": "Order not found"}));
    }
}
