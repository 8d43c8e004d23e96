mod api;
mod health;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::Router;
use spectrum_core::config::{AppConfig, LoadOptions};
use spectrum_core::telemetry::init_logging;
use spectrum_core::AnalyticsSession;

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging)
        .map_err(|error| anyhow!("failed to initialise logging: {error}"))?;

    // The session is built once and only read while serving.
    let session = Arc::new(AnalyticsSession::load(&config)?);

    let address = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "server.started",
        bind_address = %address,
        products = session.matrix().product_count(),
        cache_policy = session.settings().cache_policy.as_str(),
        "spectrum-server started"
    );

    axum::serve(listener, app(session)).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(event_name = "server.stopping", "spectrum-server stopping");
    Ok(())
}

fn app(session: Arc<AnalyticsSession>) -> Router {
    Router::new().merge(health::router(session.clone())).merge(api::router(session))
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "server.shutdown_signal_failed",
            error = %error,
            "could not listen for shutdown signal"
        );
    }
}
