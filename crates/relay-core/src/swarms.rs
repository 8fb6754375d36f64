//! Registry of deduplicated swarm sessions.
//!
//! - One [`SwarmSession`] per fingerprint, created on demand.
//! - Binding bookkeeping: which `(client, torrentKey)` pairs are
//!   subscribed to which session, plus the reverse map used to route
//!   `create-server` and to reject rebinding a key to a second
//!   fingerprint.
//! - The per-session phase machine: `Active` (≥1 binding) →
//!   `Draining` (zero bindings, grace running) → destroyed by the
//!   caller. A new binding flips a draining session back to `Active`.
//!
//! The registry only stores; actual engine teardown is performed by the
//! coordinator, which owns the engine adapter.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::coalesce::{Binding, PendingOp};
use crate::error::{BindError, EngineError};
use crate::keys::{ClientKey, InfoHash, TorrentKey};
use crate::messages::{EndpointInfo, TorrentSnapshot};

/// Lifecycle phase of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// At least one binding.
    Active,

    /// Binding set emptied at `since`; destroyed once the drain grace
    /// elapses with the set still empty.
    Draining { since: Instant },
}

/// One deduplicated engine session and its subscription state.
#[derive(Debug)]
pub struct SwarmSession<S> {
    pub hash: InfoHash,

    /// The owned engine session handle.
    pub handle: S,

    /// Last snapshot pulled from the handle; refreshed on every
    /// snapshot-class event and served to late subscribers.
    pub snapshot: TorrentSnapshot,

    /// Current subscription edges, in arrival order.
    pub bindings: Vec<Binding>,

    /// Coalesced bridging-endpoint creation state.
    pub endpoint: PendingOp<EndpointInfo>,

    pub phase: Phase,
}

impl<S> SwarmSession<S> {
    fn new(hash: InfoHash, handle: S, snapshot: TorrentSnapshot) -> Self {
        SwarmSession {
            hash,
            handle,
            snapshot,
            bindings: Vec::new(),
            endpoint: PendingOp::Absent,
            phase: Phase::Active,
        }
    }
}

/// Result of [`SwarmRegistry::add_binding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    Bound,

    /// Same `(client, key)` pair, same session: a no-op.
    AlreadyBound,
}

/// All live sessions, keyed by fingerprint.
#[derive(Debug, Default)]
pub struct SwarmRegistry<S> {
    /// `BTreeMap` for stable iteration order in sweeps and broadcasts.
    sessions: BTreeMap<InfoHash, SwarmSession<S>>,

    /// Which fingerprint each torrent key is bound to. A key maps to
    /// exactly one fingerprint for its entire lifetime.
    key_owner: HashMap<(ClientKey, TorrentKey), InfoHash>,
}

impl<S> SwarmRegistry<S> {
    pub fn new() -> Self {
        SwarmRegistry {
            sessions: BTreeMap::new(),
            key_owner: HashMap::new(),
        }
    }

    pub fn contains(&self, hash: &InfoHash) -> bool {
        self.sessions.contains_key(hash)
    }

    pub fn get(&self, hash: &InfoHash) -> Option<&SwarmSession<S>> {
        self.sessions.get(hash)
    }

    pub fn get_mut(&mut self, hash: &InfoHash) -> Option<&mut SwarmSession<S>> {
        self.sessions.get_mut(hash)
    }

    /// Look up by fingerprint; on a miss, invoke `create` and register
    /// the result. Returns the session and whether it already existed.
    ///
    /// Lookup-and-register runs inside one coordinator turn, so a
    /// second engine session is never created for the same fingerprint
    /// even under request bursts.
    pub fn find_or_create<F>(
        &mut self,
        hash: &InfoHash,
        create: F,
    ) -> Result<(&mut SwarmSession<S>, bool), EngineError>
    where
        F: FnOnce() -> Result<(S, TorrentSnapshot), EngineError>,
    {
        let existed = self.sessions.contains_key(hash);
        let session = match self.sessions.entry(hash.clone()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let (handle, snapshot) = create()?;
                vacant.insert(SwarmSession::new(hash.clone(), handle, snapshot))
            }
        };
        Ok((session, existed))
    }

    /// Append a binding. Idempotent for a repeated pair; a key already
    /// owned by a different fingerprint is rejected. A new binding
    /// revives a draining session.
    pub fn add_binding(
        &mut self,
        hash: &InfoHash,
        client: &ClientKey,
        key: &TorrentKey,
    ) -> Result<BindOutcome, BindError> {
        let owner_key = (client.clone(), key.clone());
        if let Some(owner) = self.key_owner.get(&owner_key) {
            if owner != hash {
                return Err(BindError::KeyBoundElsewhere(owner.clone()));
            }
        }

        let Some(session) = self.sessions.get_mut(hash) else {
            return Err(BindError::UnknownSession(hash.clone()));
        };

        let binding = Binding::new(client, key);
        if session.bindings.contains(&binding) {
            return Ok(BindOutcome::AlreadyBound);
        }

        session.bindings.push(binding);
        session.phase = Phase::Active;
        self.key_owner.insert(owner_key, hash.clone());
        Ok(BindOutcome::Bound)
    }

    /// Remove every binding of one client across all sessions. Returns
    /// the fingerprints that lost at least one binding; the caller
    /// settles each (drain or destroy).
    pub fn remove_bindings_for_client(&mut self, client: &ClientKey) -> Vec<InfoHash> {
        let mut affected = Vec::new();
        for (hash, session) in self.sessions.iter_mut() {
            let before = session.bindings.len();
            session.bindings.retain(|b| &b.client != client);
            if session.bindings.len() != before {
                affected.push(hash.clone());
            }
        }
        self.key_owner.retain(|(owner, _), _| owner != client);
        affected
    }

    /// Fingerprint a `(client, torrentKey)` pair is bound to, if any.
    pub fn hash_for_key(&self, client: &ClientKey, key: &TorrentKey) -> Option<&InfoHash> {
        self.key_owner.get(&(client.clone(), key.clone()))
    }

    /// Remove a session from the registry, handing its state back to
    /// the caller for engine teardown.
    pub fn remove(&mut self, hash: &InfoHash) -> Option<SwarmSession<S>> {
        let session = self.sessions.remove(hash)?;
        self.key_owner.retain(|_, owner| owner != hash);
        Some(session)
    }

    /// Draining sessions whose grace has elapsed, still have zero
    /// bindings and have no endpoint creation in flight.
    pub fn drained(&self, now: Instant, grace: Duration) -> Vec<InfoHash> {
        self.sessions
            .iter()
            .filter(|(_, s)| match s.phase {
                Phase::Draining { since } => {
                    s.bindings.is_empty()
                        && !s.endpoint.is_pending()
                        && now.saturating_duration_since(since) >= grace
                }
                Phase::Active => false,
            })
            .map(|(hash, _)| hash.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InfoHash, &SwarmSession<S>)> {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&InfoHash, &mut SwarmSession<S>)> {
        self.sessions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
