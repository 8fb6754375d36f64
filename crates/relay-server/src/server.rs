//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections and assigns each a `ConnId`.
//! - Spawns a per-connection I/O task and the single coordinator task
//!   that owns all relay state.
//!
//! The server is generic over the transfer engine; the binary wires in
//! the simulated engine from `sim`, real deployments bring their own.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use relay_core::clock::SystemClock;
use relay_core::coordinator::Coordinator;
use relay_core::engine::TransferEngine;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::conn;
use crate::coordinator_task::{self, ChannelTransport};
use crate::types::{ConnId, Turn, TurnTx};

/// Counter for assigning unique `ConnId`s over the process lifetime.
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

fn next_conn_id() -> ConnId {
    ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
}

/// Bind and run the relay server with the given configuration.
///
/// `make_engine` receives the turn sender so the engine adapter can
/// deliver session events and endpoint completions back into the
/// coordinator.
pub async fn run<E, F>(config: Config, make_engine: F) -> Result<()>
where
    E: TransferEngine + Send + 'static,
    E::Session: Send + 'static,
    F: FnOnce(TurnTx) -> E,
{
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    run_with_listener(listener, config, make_engine).await
}

/// Run on a pre-bound listener (used by tests, which bind port 0).
pub async fn run_with_listener<E, F>(
    listener: TcpListener,
    config: Config,
    make_engine: F,
) -> Result<()>
where
    E: TransferEngine + Send + 'static,
    E::Session: Send + 'static,
    F: FnOnce(TurnTx) -> E,
{
    let (turn_tx, turn_rx): (TurnTx, _) = mpsc::unbounded_channel::<Turn>();

    let engine = make_engine(turn_tx.clone());
    let coordinator = Coordinator::new(
        engine,
        ChannelTransport::new(),
        SystemClock,
        config.coordinator(),
    );

    tokio::spawn(coordinator_task::run(
        turn_rx,
        coordinator,
        config.update_interval(),
    ));

    let active_conns = Arc::new(AtomicUsize::new(0));

    loop {
        let (stream, peer_addr) = listener.accept().await?;

        if active_conns.load(Ordering::Acquire) >= config.max_clients {
            warn!(%peer_addr, max_clients = config.max_clients, "rejecting connection: at capacity");
            // Drop the stream; the peer sees the connection close.
            continue;
        }

        let conn = next_conn_id();
        info!(conn = conn.0, %peer_addr, "accepted connection");

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let turn_tx = turn_tx.clone();
        let active = active_conns.clone();
        active.fetch_add(1, Ordering::AcqRel);

        tokio::spawn(async move {
            if let Err(err) = conn::run_conn(conn, stream, turn_tx, out_tx, out_rx).await {
                warn!(conn = conn.0, error = %err, "connection error");
            } else {
                info!(conn = conn.0, "connection closed");
            }
            active.fetch_sub(1, Ordering::AcqRel);
        });
    }
}
