//! Registry of connected clients and their last-seen times.
//!
//! Deliberately dumb: an upsert, a pure sweep query and a removal. All
//! cascading cleanup after an expiry is the sweeper's job, not this
//! registry's.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::keys::ClientKey;

/// Last-seen bookkeeping for every known client.
///
/// Backed by a `BTreeMap` so iteration (and therefore every engine-wide
/// broadcast) has a stable order.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<ClientKey, Instant>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        ClientRegistry::default()
    }

    /// Idempotent upsert of the last-seen time. Returns `true` when the
    /// key was previously unknown.
    pub fn touch(&mut self, key: &ClientKey, now: Instant) -> bool {
        self.clients.insert(key.clone(), now).is_none()
    }

    /// Clients silent for longer than `timeout`. Pure query; the caller
    /// decides what to do with them.
    pub fn sweep(&self, now: Instant, timeout: Duration) -> Vec<ClientKey> {
        self.clients
            .iter()
            .filter(|(_, last)| now.saturating_duration_since(**last) > timeout)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn remove(&mut self, key: &ClientKey) {
        self.clients.remove(key);
    }

    pub fn contains(&self, key: &ClientKey) -> bool {
        self.clients.contains_key(key)
    }

    /// All known clients, in stable order.
    pub fn keys(&self) -> impl Iterator<Item = &ClientKey> {
        self.clients.keys()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
