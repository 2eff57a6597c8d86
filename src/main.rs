use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use devcamper_api::app;
use devcamper_api::config::AppConfig;
use devcamper_api::database::PgStore;
use devcamper_api::geocoder::MapQuestGeocoder;
use devcamper_api::mail::SmtpMailer;
use devcamper_api::middleware::rate_limit::spawn_cleanup_task;
use devcamper_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,devcamper_api=debug")),
        )
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Starting DevCamper API in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set");
    }

    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let geocoder = MapQuestGeocoder::new(&config.geocoder).context("failed to build geocoder")?;
    let mailer = SmtpMailer::new(&config.mail).context("failed to build mailer")?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, Arc::new(store), Arc::new(geocoder), Arc::new(mailer));
    let _cleanup = spawn_cleanup_task(state.rate_limit.clone(), Duration::from_secs(60));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("DevCamper API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
