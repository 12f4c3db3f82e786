//! Outbound clients for the hosted services the store depends on.
//!
//! - **payment_gateway**: bill creation and webhook signature checks
//! - **loyverse**: POS item catalog and inventory levels
//! - **parcel**: courier tracking lookups

pub mod loyverse;
pub mod parcel;
pub mod payment_gateway;

pub use loyverse::LoyverseClient;
pub use parcel::ParcelClient;
pub use payment_gateway::PaymentGateway;

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{service} request failed: {source}")]
    Http { service: &'static str, #[source] source: reqwest::Error },

    #[error("{service} returned {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },

    #[error("{service} response was not understood: {detail}")]
    Decode { service: &'static str, detail: String },
}

impl IntegrationError {
    pub(crate) fn http(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Http { service, source }
    }
}

/// Shared client settings: every outbound call gets the same timeout.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("basecamp-store/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Turns a non-2xx response into [`IntegrationError::Status`], keeping the body for the log.
pub(crate) async fn check_status(service: &'static str, resp: reqwest::Response) -> Result<reqwest::Response, IntegrationError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(IntegrationError::Status { service, status: status.as_u16(), body })
}
