//! Payment gateway client
//!
//! Bills are created per order; the gateway later calls `/webhooks/payment`
//! with a JSON body signed by HMAC-SHA256 over the raw bytes.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{check_status, IntegrationError};
use crate::config::PaymentConfig;

const SERVICE: &str = "payment gateway";

/// Header carrying the hex signature of the webhook body.
pub const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Clone)]
pub struct PaymentGateway {
    http: reqwest::Client,
    config: PaymentConfig,
}

#[derive(Debug, Serialize)]
pub struct BillRequest<'a> {
    pub collection_id: &'a str,
    pub email: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<&'a str>,
    /// Minor units (sen)
    pub amount: i64,
    pub description: String,
    pub callback_url: &'a str,
    pub redirect_url: &'a str,
    pub reference_1_label: &'static str,
    pub reference_1: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Bill {
    pub id: String,
    pub url: String,
}

/// Body of a payment webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    pub event_id: String,
    pub bill_id: String,
    /// Order number given as `reference_1` at bill creation
    pub reference: Option<String>,
    pub status: PaymentState,
    /// Minor units (sen)
    pub amount: i64,
    pub paid_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentState { Paid, Failed, Expired }

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Paid => "paid", Self::Failed => "failed", Self::Expired => "expired" }
    }
}

impl PaymentGateway {
    pub fn new(http: reqwest::Client, config: PaymentConfig) -> Self {
        Self { http, config }
    }

    pub fn webhook_secret(&self) -> &str { &self.config.webhook_secret }

    pub async fn create_bill(
        &self,
        order_number: &str,
        customer_name: &str,
        email: &str,
        mobile: Option<&str>,
        amount_minor: i64,
    ) -> Result<Bill, IntegrationError> {
        let request = BillRequest {
            collection_id: &self.config.collection_id,
            email,
            name: customer_name,
            mobile,
            amount: amount_minor,
            description: format!("Order {order_number}"),
            callback_url: &self.config.callback_url,
            redirect_url: &self.config.redirect_url,
            reference_1_label: "Order",
            reference_1: order_number,
        };

        let resp = self
            .http
            .post(format!("{}/api/v3/bills", self.config.api_url.trim_end_matches('/')))
            .basic_auth(&self.config.api_key, Some(""))
            .json(&request)
            .send()
            .await
            .map_err(IntegrationError::http(SERVICE))?;

        let bill: Bill = check_status(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::Decode { service: SERVICE, detail: e.to_string() })?;

        tracing::info!(order_number, bill_id = %bill.id, "Payment bill created");
        Ok(bill)
    }
}

/// Verify a webhook signature: hex HMAC-SHA256 of the raw body, optionally prefixed `sha256=`.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> Result<(), &'static str> {
    let hex_sig = header.trim();
    let hex_sig = hex_sig.strip_prefix("sha256=").unwrap_or(hex_sig);
    if hex_sig.is_empty() {
        return Err("Empty signature");
    }
    let sig_bytes = hex::decode(hex_sig).map_err(|_| "Invalid signature hex")?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(payload);
    // verify_slice compares in constant time
    mac.verify_slice(&sig_bytes).map_err(|_| "Signature mismatch")
}

/// Signs a payload the way the gateway does. Used by tests and local tooling.
pub fn sign(payload: &[u8], secret: &str) -> Result<String, &'static str> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec-test";

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"event_id":"evt_1","bill_id":"b1","status":"paid","amount":100}"#;
        let sig = sign(body, SECRET).unwrap();
        assert!(verify_signature(body, &sig, SECRET).is_ok());
        assert!(verify_signature(body, &format!("sha256={sig}"), SECRET).is_ok());
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let sig = sign(b"{\"amount\":100}", SECRET).unwrap();
        assert_eq!(verify_signature(b"{\"amount\":1}", &sig, SECRET), Err("Signature mismatch"));
        assert_eq!(verify_signature(b"{}", "zz", SECRET), Err("Invalid signature hex"));
        assert_eq!(verify_signature(b"{}", "", SECRET), Err("Empty signature"));
        assert!(verify_signature(b"{}", &sign(b"{}", "other").unwrap(), SECRET).is_err());
    }

    #[test]
    fn test_notification_parses() {
        let n: PaymentNotification = serde_json::from_str(
            r#"{"event_id":"evt_9","bill_id":"8x7k","reference":"BC-20261016-0A1B2C","status":"paid","amount":21990,"paid_at":"2026-10-16T08:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(n.status, PaymentState::Paid);
        assert_eq!(n.amount, 21990);
        assert_eq!(n.reference.as_deref(), Some("BC-20261016-0A1B2C"));
    }

    #[test]
    fn test_bill_request_shape() {
        let req = BillRequest {
            collection_id: "col", email: "a@b.my", name: "Aina", mobile: None, amount: 5000,
            description: "Order BC-1".into(), callback_url: "cb", redirect_url: "rd", reference_1_label: "Order", reference_1: "BC-1",
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["amount"], 5000);
        assert!(json.get("mobile").is_none());
    }
}
