//! Shared application state

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::integrations::{http_client, LoyverseClient, ParcelClient, PaymentGateway};
use crate::services::events::EventPublisher;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub events: EventPublisher,
    pub payments: PaymentGateway,
    pub pos: LoyverseClient,
    pub parcels: ParcelClient,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, nats: Option<async_nats::Client>) -> anyhow::Result<Self> {
        let http = http_client(config.http_timeout)?;
        Ok(Self {
            db,
            events: EventPublisher::new(nats),
            payments: PaymentGateway::new(http.clone(), config.payment.clone()),
            pos: LoyverseClient::new(http.clone(), config.pos.clone()),
            parcels: ParcelClient::new(http, config.parcel.clone()),
            config: Arc::new(config),
        })
    }
}
