//! Service configuration, read from the environment (and `.env` in development).

use anyhow::{anyhow, Context};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::aggregates::ShippingPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    /// development | staging | production
    pub environment: String,
    pub nats_url: Option<String>,
    /// Bearer token required on `/api/v1/admin`
    pub admin_api_token: String,
    pub currency: String,
    pub shipping: ShippingPolicy,
    pub reservation_ttl: Duration,
    pub movement_archive_after_days: i64,
    pub http_timeout: Duration,
    pub tracking_deadline: Duration,
    pub payment: PaymentConfig,
    pub pos: PosConfig,
    pub parcel: ParcelConfig,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub api_url: String,
    pub api_key: String,
    pub collection_id: String,
    pub webhook_secret: String,
    pub callback_url: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct PosConfig {
    pub api_url: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct ParcelConfig {
    pub api_url: String,
    pub api_key: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let secret = |name: &str| require_secret(name, &environment);

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            port: parse_or("PORT", 8083)?,
            nats_url: std::env::var("NATS_URL").ok().filter(|s| !s.is_empty()),
            admin_api_token: secret("ADMIN_API_TOKEN")?,
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "MYR".into()),
            shipping: ShippingPolicy {
                flat_fee: parse_or("SHIPPING_FEE", Decimal::new(1000, 2))?,
                free_threshold: parse_or("FREE_SHIPPING_THRESHOLD", Decimal::new(20000, 2))?,
            },
            reservation_ttl: Duration::from_secs(60 * parse_or::<u64>("RESERVATION_TTL_MINUTES", 30)?),
            movement_archive_after_days: parse_or("MOVEMENT_ARCHIVE_DAYS", 90)?,
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)?),
            tracking_deadline: Duration::from_millis(parse_or("TRACKING_DEADLINE_MS", 5000)?),
            payment: PaymentConfig {
                api_url: std::env::var("PAYMENT_API_URL").unwrap_or_else(|_| "https://www.billplz-sandbox.com".into()),
                api_key: secret("PAYMENT_API_KEY")?,
                collection_id: secret("PAYMENT_COLLECTION_ID")?,
                webhook_secret: secret("PAYMENT_WEBHOOK_SECRET")?,
                callback_url: std::env::var("PAYMENT_CALLBACK_URL")
                    .unwrap_or_else(|_| "http://localhost:8083/webhooks/payment".into()),
                redirect_url: std::env::var("PAYMENT_REDIRECT_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/checkout/complete".into()),
            },
            pos: PosConfig {
                api_url: std::env::var("POS_API_URL").unwrap_or_else(|_| "https://api.loyverse.com".into()),
                access_token: secret("POS_ACCESS_TOKEN")?,
            },
            parcel: ParcelConfig {
                api_url: std::env::var("PARCEL_API_URL").unwrap_or_else(|_| "https://api.parcelasia.com".into()),
                api_key: secret("PARCEL_API_KEY")?,
            },
            environment,
        })
    }

    pub fn is_development(&self) -> bool { self.environment == "development" }
}

impl Default for Config {
    /// Development defaults; no external service is reachable with these.
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/basecamp_store".into(),
            database_max_connections: 10,
            port: 8083,
            environment: "development".into(),
            nats_url: None,
            admin_api_token: "dev-admin-token".into(),
            currency: "MYR".into(),
            shipping: ShippingPolicy { flat_fee: Decimal::new(1000, 2), free_threshold: Decimal::new(20000, 2) },
            reservation_ttl: Duration::from_secs(30 * 60),
            movement_archive_after_days: 90,
            http_timeout: Duration::from_secs(10),
            tracking_deadline: Duration::from_secs(5),
            payment: PaymentConfig {
                api_url: "http://127.0.0.1:9".into(),
                api_key: "dev-payment-key".into(),
                collection_id: "dev-collection".into(),
                webhook_secret: "dev-webhook-secret".into(),
                callback_url: "http://localhost:8083/webhooks/payment".into(),
                redirect_url: "http://localhost:3000/checkout/complete".into(),
            },
            pos: PosConfig { api_url: "http://127.0.0.1:9".into(), access_token: "dev-pos-token".into() },
            parcel: ParcelConfig { api_url: "http://127.0.0.1:9".into(), api_key: "dev-parcel-key".into() },
        }
    }
}

/// Secrets must be present outside development; in development a placeholder is used.
fn require_secret(name: &str, environment: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ if environment == "development" => Ok(format!("dev-{}-not-for-production", name.to_lowercase())),
        _ => Err(anyhow!("{name} must be set in {environment} environment")),
    }
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| anyhow!("{name}: {e}")),
        _ => Ok(default),
    }
}
