//! Shared types for the relay TCP server.
//!
//! This module defines:
//! - `ConnId`: a lightweight handle for accepted connections
//! - `Turn`: everything that can wake the coordinator task
//! - channel aliases between connections and the coordinator task

use relay_core::engine::SessionEvent;
use relay_core::keys::InfoHash;
use relay_core::messages::{EndpointInfo, FaultReport, InboundEnvelope, OutboundEnvelope};
use tokio::sync::mpsc;

/// Identifier for an accepted TCP connection.
///
/// Distinct from `ClientKey`: the client key travels inside messages
/// and survives reconnects, while a `ConnId` is unique per accepted
/// socket over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

/// Outbound envelopes from the coordinator task to one connection.
pub type OutboundTx = mpsc::UnboundedSender<OutboundEnvelope>;
pub type OutboundRx = mpsc::UnboundedReceiver<OutboundEnvelope>;

/// One unit of work for the coordinator task. Each variant becomes one
/// run-to-completion turn; the single consumer is what serializes
/// concurrent connections, engine activity and timers.
#[derive(Debug)]
pub enum Turn {
    /// A decoded message from a connection, with the channel to reach
    /// that connection again.
    Inbound {
        conn: ConnId,
        reply: OutboundTx,
        envelope: InboundEnvelope,
    },

    /// An event from one engine session.
    Session {
        hash: InfoHash,
        event: SessionEvent,
    },

    /// An engine-wide fault with no session scope.
    GlobalFault { fault: FaultReport, fatal: bool },

    /// Completion of a bridging-endpoint creation.
    Endpoint {
        hash: InfoHash,
        outcome: Result<EndpointInfo, FaultReport>,
    },

    /// A connection went away; dead routes can be pruned.
    ConnClosed { conn: ConnId },
}

/// Channel from connections (and the engine) into the coordinator task.
pub type TurnTx = mpsc::UnboundedSender<Turn>;
pub type TurnRx = mpsc::UnboundedReceiver<Turn>;
