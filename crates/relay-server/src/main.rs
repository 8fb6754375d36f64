//! Swarm relay over TCP, backed by the simulated transfer engine.
//!
//! Real deployments call `relay_server::server::run` with their own
//! `TransferEngine`; this binary exists to run the relay protocol
//! end-to-end locally.

use relay_server::config::Config;
use relay_server::server;
use relay_server::sim::SimEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        heartbeat_timeout_ms = config.heartbeat_timeout_ms,
        update_interval_ms = config.update_interval_ms,
        "starting relay-server"
    );

    server::run(config, SimEngine::new).await
}
