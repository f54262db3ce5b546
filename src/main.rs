//! Caffe Storefront HTTP server

use anyhow::{Context, Result};
use caffe_storefront::config::AppConfig;
use caffe_storefront::services::{cart_sweeper, EmailService, EventPublisher};
use caffe_storefront::state::AppState;
use caffe_storefront::{db, routes};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caffe_storefront=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let pool = db::create_pool(&config.database_url).await.context("Failed to connect to database")?;
    db::run_migrations(&pool).await.context("Failed to run migrations")?;
    tracing::info!("Database ready");

    let email = match config.email.as_ref().map(EmailService::new).transpose() {
        Ok(service) => service,
        Err(e) => {
            tracing::warn!(error = %e, "Email disabled: SMTP setup failed");
            None
        }
    };
    if email.is_none() {
        tracing::info!("Order confirmation emails disabled");
    }

    tokio::spawn(cart_sweeper::run(pool.clone(), config.cart_ttl, cart_sweeper::SWEEP_INTERVAL));

    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let addr = config.socket_addr();
    let state = AppState::new(config, pool, email, events);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "Caffe Storefront listening");
    axum::serve(listener, app).await?;
    Ok(())
}
