//! Identity Gate Server
//!
//! Standalone reverse proxy that puts an upstream service behind basic auth
//! checked against a remote identity service.

use std::net::SocketAddr;
use std::sync::Arc;

use identity_gate::{
    proxy::{self, ProxyState},
    AuthGate, Config, ServerConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,identity_gate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Identity Gate v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let server_config = ServerConfig::from_env()?;
    tracing::info!("Configuration loaded");

    // Unreachable identity service or bad configuration stops startup here
    let gate = AuthGate::new(config).await?;

    tracing::info!(upstream = %server_config.upstream_url, "Forwarding authorized requests");
    let app = proxy::router(Arc::new(gate), ProxyState::new(server_config.upstream_url));

    let addr: SocketAddr = server_config.bind_address.parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
