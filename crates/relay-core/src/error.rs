//! Error types for the relay core.

use thiserror::Error;

use crate::keys::InfoHash;

/// Failure reported by the transfer engine adapter.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The torrent identifier could not be resolved to a fingerprint.
    #[error("invalid torrent id: {0}")]
    InvalidTorrentId(String),

    /// The engine failed to open a session.
    #[error("engine failure: {0}")]
    Internal(String),
}

/// Failure adding a subscription binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The torrent key is already bound to a different session.
    ///
    /// A key stays bound to one fingerprint for its entire lifetime;
    /// repointing it is invalid input and is rejected rather than
    /// silently rebound.
    #[error("torrent key already bound to {0}")]
    KeyBoundElsewhere(InfoHash),

    /// No session exists for the given fingerprint.
    #[error("no session for {0}")]
    UnknownSession(InfoHash),
}
