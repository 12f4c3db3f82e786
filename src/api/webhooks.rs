//! Payment gateway webhook
//!
//! POST /webhooks/payment - raw body, HMAC-verified before anything is parsed

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::db;
use crate::integrations::payment_gateway::{verify_signature, PaymentNotification, SIGNATURE_HEADER};
use crate::services::payments;
use crate::state::AppState;

pub async fn payment_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Payment webhook without signature header");
        return StatusCode::UNAUTHORIZED;
    };

    if let Err(e) = verify_signature(&body, signature, state.payments.webhook_secret()) {
        tracing::warn!(error = e, "Payment webhook signature rejected");
        return StatusCode::UNAUTHORIZED;
    }

    let notification: PaymentNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(%e, "Unreadable payment webhook body");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_id = notification.event_id.as_str();
    tracing::info!(event_id, bill_id = %notification.bill_id, status = notification.status.as_str(), "Payment webhook received");

    // Claim the event first so concurrent deliveries of the same id do the work once.
    match db::webhooks::record_event(&state.db, event_id, notification.status.as_str()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(event_id, "Duplicate payment webhook, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(event_id, error = %e, "Failed to record webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    match payments::handle_notification(&state, &notification).await {
        Ok(outcome) => {
            tracing::info!(event_id, ?outcome, "Payment webhook processed");
            StatusCode::OK
        }
        Err(e) => {
            // Let the gateway's retry reach us again.
            if let Err(forget) = db::webhooks::forget_event(&state.db, event_id).await {
                tracing::error!(event_id, error = %forget, "Failed to release webhook event");
            }
            tracing::warn!(event_id, error = %e, "Payment webhook processing failed");
            e.status()
        }
    }
}
