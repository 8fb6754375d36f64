//! relay-core
//!
//! Pure swarm-relay coordinator logic:
//! - message types (inbound/outbound envelopes and snapshots)
//! - client and swarm registries
//! - event fan-out and request coalescing
//! - the coordinator dispatcher and its liveness sweeper
//!
//! Everything here is single-threaded, run-to-completion and free of
//! I/O; the `relay-server` crate supplies the runtime, the transport
//! and a transfer engine.

pub mod clients;
pub mod clock;
pub mod coalesce;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod keys;
pub mod messages;
pub mod swarms;
pub mod transport;

mod fanout;
mod sweeper;

pub use clients::ClientRegistry;
pub use clock::{Clock, SystemClock};
pub use coalesce::{Binding, PendingOp, RequestOutcome};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use engine::{SessionEvent, TransferEngine, TransferSession};
pub use error::{BindError, EngineError};
pub use keys::{ClientKey, InfoHash, TorrentKey};
pub use messages::{
    AddOptions, DestroyOptions, EndpointInfo, FaultReport, FileEntry, InboundEnvelope,
    Notification, OutboundEnvelope, Request, ServerOptions, TorrentSnapshot, TransferProgress,
};
pub use swarms::{BindOutcome, Phase, SwarmRegistry, SwarmSession};
pub use transport::Transport;
