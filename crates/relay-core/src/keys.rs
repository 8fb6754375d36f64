//! Opaque identifier newtypes used throughout the relay.
//!
//! All three are caller-supplied strings; we never interpret their
//! contents, we only compare and hash them:
//! - [`ClientKey`]: identifies one remote caller.
//! - [`TorrentKey`]: caller-chosen key scoping one client's view of a
//!   session (one subscription edge is a `(ClientKey, TorrentKey)` pair).
//! - [`InfoHash`]: content fingerprint used to deduplicate sessions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one remote client.
///
/// Intentionally opaque; clients generate their own (typically a UUID)
/// and include it in every message.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientKey(pub String);

/// Caller-chosen key identifying one subscription of one client.
///
/// Unique per client, not globally; the coordinator always pairs it
/// with the sending [`ClientKey`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorrentKey(pub String);

/// Content-derived fingerprint of a transferable item.
///
/// Exactly one live session exists per fingerprint; this is the
/// deduplication key of the swarm registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InfoHash(pub String);

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TorrentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientKey {
    fn from(s: &str) -> Self {
        ClientKey(s.to_string())
    }
}

impl From<&str> for TorrentKey {
    fn from(s: &str) -> Self {
        TorrentKey(s.to_string())
    }
}

impl From<&str> for InfoHash {
    fn from(s: &str) -> Self {
        InfoHash(s.to_string())
    }
}
