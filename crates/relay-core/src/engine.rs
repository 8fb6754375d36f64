//! Transfer-engine adapter contract.
//!
//! The engine that actually moves bytes is an external collaborator.
//! The coordinator only ever talks to it through these traits, so tests
//! drive the whole core against a stub and the server crate plugs in a
//! real (or simulated) engine.
//!
//! Delivery of engine activity back into the coordinator is the
//! adapter owner's job: session events arrive via
//! [`Coordinator::session_event`](crate::coordinator::Coordinator::session_event)
//! and endpoint completions via
//! [`Coordinator::endpoint_ready`](crate::coordinator::Coordinator::endpoint_ready),
//! each as its own run-to-completion turn. Nothing in this trait may
//! block a coordinator turn on I/O.

use crate::error::EngineError;
use crate::keys::InfoHash;
use crate::messages::{AddOptions, FaultReport, ServerOptions, TorrentSnapshot, TransferProgress};

/// The shared transfer-engine instance.
///
/// The coordinator maintains the invariant that the shared instance is
/// live iff at least one session exists: `open` implies the instance is
/// up, and [`TransferEngine::shutdown`] is called exactly when the last
/// session has been closed.
pub trait TransferEngine {
    type Session: TransferSession;

    /// Derive the deduplication fingerprint from a torrent identifier
    /// (magnet link, hex hash, ...) without opening anything.
    fn resolve(&self, torrent_id: &str) -> Result<InfoHash, EngineError>;

    /// Open a new session. Called at most once per live fingerprint.
    fn open(&mut self, torrent_id: &str, options: &AddOptions)
        -> Result<Self::Session, EngineError>;

    /// Tear down the shared engine-wide instance. Called after the last
    /// session has been closed.
    fn shutdown(&mut self);
}

/// One open engine session.
pub trait TransferSession {
    /// Current identity/metadata/progress view as a plain record.
    fn describe(&self) -> TorrentSnapshot;

    /// Current progress fields only.
    fn progress(&self) -> TransferProgress;

    /// Kick off bridging-endpoint creation. Fire-and-forget: the
    /// outcome comes back later as an `endpoint_ready` turn. The
    /// coordinator guarantees at most one outstanding call per session.
    fn start_endpoint(&mut self, options: &ServerOptions);

    /// Close this session and release its resources.
    fn close(&mut self);
}

/// Event emitted by an engine session, relayed to that session's
/// subscribers in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The fingerprint is known.
    IdentityKnown,

    /// Name, length and file list are known.
    MetadataKnown,

    /// Progress fields changed.
    ProgressChanged,

    /// The transfer finished.
    Completed,

    /// Non-fatal session-scoped fault.
    Warning(FaultReport),

    /// Session-scoped fault.
    Error(FaultReport),
}
