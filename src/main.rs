//! Basecamp Store - storefront and back-office service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use basecamp_store::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "basecamp_store=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.is_development() {
        tracing::warn!("Development environment: unset secrets fall back to placeholders");
    }
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match config.nats_url.as_deref() {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will not be published");
                None
            }
        },
        None => None,
    };

    let port = config.port;
    let environment = config.environment.clone();
    let state = AppState::new(db, config, nats)?;
    let app = create_router(state);

    tracing::info!(port, %environment, "Basecamp Store listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", port)).await?, app).await?;
    Ok(())
}
