//! Hass Bridge - push channel server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hass_bridge::api::{create_router, AppState};
use hass_bridge::config::BridgeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hass_bridge=info")),
        )
        .init();

    let config = BridgeConfig::from_env().context("invalid configuration")?;
    let state = Arc::new(AppState::new(&config));
    let _maintenance = state.sse.spawn_maintenance();

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        version = hass_bridge::VERSION,
        max_clients = config.sse.max_clients,
        "push channel listening"
    );

    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; run until killed
        std::future::pending::<()>().await;
    }
}
