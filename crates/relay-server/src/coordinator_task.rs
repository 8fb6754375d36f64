//! The single task that owns the coordinator.
//!
//! All relay state lives here, behind one mpsc receiver: inbound
//! messages, engine events, endpoint completions and the liveness tick
//! are consumed one at a time, which is what gives the core its
//! run-to-completion turn model. Connections never touch the
//! coordinator directly.

use std::collections::HashMap;
use std::time::Duration;

use relay_core::clock::SystemClock;
use relay_core::coordinator::Coordinator;
use relay_core::engine::TransferEngine;
use relay_core::keys::ClientKey;
use relay_core::messages::OutboundEnvelope;
use relay_core::transport::Transport;
use tracing::{debug, info};

use crate::types::{OutboundTx, Turn, TurnRx};

/// Transport that routes outbound envelopes to per-connection channels
/// by `clientKey`. Fire-and-forget: an envelope for a key with no live
/// route is dropped (the client is gone or not yet registered).
#[derive(Debug, Default)]
pub struct ChannelTransport {
    routes: HashMap<ClientKey, OutboundTx>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        ChannelTransport::default()
    }

    /// Point a client key at a connection. Called on every inbound
    /// message, so a reconnecting client overwrites its stale route.
    pub fn register(&mut self, client: ClientKey, tx: OutboundTx) {
        self.routes.insert(client, tx);
    }

    /// Drop routes whose connection has gone away.
    pub fn prune(&mut self) {
        self.routes.retain(|_, tx| !tx.is_closed());
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, message: OutboundEnvelope) {
        match self.routes.get(&message.client_key) {
            Some(tx) => {
                // A closed channel means the conn died under us; the
                // liveness sweeper will reclaim the client.
                let _ = tx.send(message);
            }
            None => {
                debug!(client = %message.client_key, "no route for outbound envelope");
            }
        }
    }
}

/// Run the coordinator loop until the turn channel closes.
pub async fn run<E>(
    mut turn_rx: TurnRx,
    mut coordinator: Coordinator<E, ChannelTransport, SystemClock>,
    update_interval: Duration,
) where
    E: TransferEngine,
{
    let mut ticker = (!update_interval.is_zero()).then(|| {
        let start = tokio::time::Instant::now() + update_interval;
        tokio::time::interval_at(start, update_interval)
    });

    loop {
        tokio::select! {
            maybe_turn = turn_rx.recv() => {
                let Some(turn) = maybe_turn else { break };
                handle_turn(&mut coordinator, turn);
            }
            _ = async {
                match ticker.as_mut() {
                    Some(ticker) => { ticker.tick().await; }
                    // Branch is disabled below when there is no ticker.
                    None => std::future::pending::<()>().await,
                }
            }, if ticker.is_some() => {
                coordinator.tick();
            }
        }
    }

    info!("coordinator loop shutting down (turn channel closed)");
}

fn handle_turn<E>(coordinator: &mut Coordinator<E, ChannelTransport, SystemClock>, turn: Turn)
where
    E: TransferEngine,
{
    match turn {
        Turn::Inbound {
            conn: _,
            reply,
            envelope,
        } => {
            coordinator
                .transport_mut()
                .register(envelope.client_key.clone(), reply);
            coordinator.receive(envelope);
        }
        Turn::Session { hash, event } => coordinator.session_event(&hash, event),
        Turn::GlobalFault { fault, fatal } => coordinator.global_fault(fault, fatal),
        Turn::Endpoint { hash, outcome } => coordinator.endpoint_ready(&hash, outcome),
        Turn::ConnClosed { conn } => {
            debug!(conn = conn.0, "connection closed; pruning dead routes");
            coordinator.transport_mut().prune();
        }
    }
}
