//! Coalescing of concurrent resource-creation requests.
//!
//! A single underlying async creation (e.g. "start the bridging
//! endpoint for this session") must serve arbitrarily many
//! near-simultaneous requesters. [`PendingOp`] is the three-state
//! machine that makes the guarantees explicit:
//!
//! - at most one underlying start per operation,
//! - every waiter is flushed exactly once, success or failure, in FIFO
//!   arrival order,
//! - failure resets to `Absent`, so a later request retries cleanly.

use crate::keys::{ClientKey, TorrentKey};

/// One subscription edge: the addressee of a coalesced result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub client: ClientKey,
    pub torrent_key: TorrentKey,
}

impl Binding {
    pub fn new(client: &ClientKey, torrent_key: &TorrentKey) -> Self {
        Binding {
            client: client.clone(),
            torrent_key: torrent_key.clone(),
        }
    }
}

/// State of one coalesced creation.
#[derive(Debug, Clone)]
pub enum PendingOp<T> {
    /// Never started, or reset after a failure.
    Absent,

    /// Underlying creation in flight; everyone who asked meanwhile.
    Pending { waiters: Vec<Binding> },

    /// Completed; the result is served synchronously from here on.
    Ready(T),
}

/// What the caller must do after [`PendingOp::request`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome<T> {
    /// Cached result; reply to the requester now.
    Ready(T),

    /// Joined the waiter list of an in-flight creation; do nothing.
    Joined,

    /// This request is the first: perform the single underlying start.
    MustStart,
}

// Manual impl: the derive would demand `T: Default`, which the result
// types stored here do not have.
impl<T> Default for PendingOp<T> {
    fn default() -> Self {
        PendingOp::Absent
    }
}

impl<T: Clone> PendingOp<T> {
    /// Record one requester and report what the caller must do.
    pub fn request(&mut self, waiter: Binding) -> RequestOutcome<T> {
        match self {
            PendingOp::Ready(value) => RequestOutcome::Ready(value.clone()),
            PendingOp::Pending { waiters } => {
                waiters.push(waiter);
                RequestOutcome::Joined
            }
            PendingOp::Absent => {
                *self = PendingOp::Pending {
                    waiters: vec![waiter],
                };
                RequestOutcome::MustStart
            }
        }
    }

    /// Cache a successful result and drain the waiters, FIFO.
    pub fn resolve(&mut self, value: T) -> Vec<Binding> {
        let waiters = self.take_waiters();
        *self = PendingOp::Ready(value);
        waiters
    }

    /// Discard the in-flight state after a failure and drain the
    /// waiters, FIFO. The next request starts fresh.
    pub fn fail(&mut self) -> Vec<Binding> {
        let waiters = self.take_waiters();
        *self = PendingOp::Absent;
        waiters
    }

    /// Whether an underlying creation is currently in flight. A session
    /// is never destroyed while this is true.
    pub fn is_pending(&self) -> bool {
        matches!(self, PendingOp::Pending { .. })
    }

    fn take_waiters(&mut self) -> Vec<Binding> {
        match std::mem::take(self) {
            PendingOp::Pending { waiters } => waiters,
            other => {
                *self = other;
                Vec::new()
            }
        }
    }
}
