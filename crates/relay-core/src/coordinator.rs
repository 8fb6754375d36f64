//! The coordinator: single owner of all relay state.
//!
//! Every mutation of the client registry, the swarm registry and the
//! pending-operation state happens inside one of the entry points
//! below, and each call runs to completion before the next begins. The
//! owner (one task in the server crate, plain calls in tests)
//! serializes inbound messages, engine events, endpoint completions and
//! timer ticks into that single sequence, which is what makes the
//! lookup-and-register paths race-free without locks.
//!
//! No entry point blocks on I/O and none lets an error escape the turn:
//! faults become outbound `warning`/`error` messages or a log line.
//!
//! The liveness tick lives in the `sweeper` module.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clients::ClientRegistry;
use crate::clock::Clock;
use crate::coalesce::{Binding, RequestOutcome};
use crate::engine::{SessionEvent, TransferEngine, TransferSession};
use crate::error::BindError;
use crate::fanout;
use crate::keys::{ClientKey, InfoHash, TorrentKey};
use crate::messages::{
    AddOptions, DestroyOptions, EndpointInfo, FaultReport, InboundEnvelope, Notification,
    OutboundEnvelope, Request, ServerOptions,
};
use crate::swarms::{Phase, SwarmRegistry};
use crate::transport::Transport;

/// Tunables. All durations overridable; zero disables the behavior.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// A client silent longer than this is expired by the sweeper.
    /// Zero disables expiry entirely.
    pub heartbeat_timeout: Duration,

    /// Interval between sweeper ticks (expiry, drain, periodic
    /// `update` broadcasts). Zero disables the tick; the owner must
    /// then never call `tick`, and zero-binding sessions are torn down
    /// immediately since nothing would advance the drain grace.
    pub update_interval: Duration,

    /// How long a session with zero bindings lingers before teardown,
    /// absorbing immediate reconnects. Zero destroys at once.
    pub drain_grace: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            heartbeat_timeout: Duration::from_secs(30),
            update_interval: Duration::from_secs(1),
            drain_grace: Duration::from_secs(5),
        }
    }
}

/// The message dispatcher and single owner of relay state.
///
/// Engine adapter, transport and clock are constructor-injected, so any
/// number of independent coordinators can coexist in one process (and
/// in one test).
pub struct Coordinator<E: TransferEngine, T: Transport, C: Clock> {
    pub(crate) engine: E,
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub(crate) config: CoordinatorConfig,
    pub(crate) clients: ClientRegistry,
    pub(crate) swarms: SwarmRegistry<E::Session>,
}

impl<E: TransferEngine, T: Transport, C: Clock> Coordinator<E, T, C> {
    pub fn new(engine: E, transport: T, clock: C, config: CoordinatorConfig) -> Self {
        Coordinator {
            engine,
            transport,
            clock,
            config,
            clients: ClientRegistry::new(),
            swarms: SwarmRegistry::new(),
        }
    }

    /// Process one inbound message: refresh the sender's liveness, then
    /// dispatch on the request type. Unknown types are logged and
    /// dropped, never an error.
    pub fn receive(&mut self, envelope: InboundEnvelope) {
        let InboundEnvelope {
            client_key,
            torrent_key,
            request,
        } = envelope;

        let now = self.clock.now();
        if self.clients.touch(&client_key, now) {
            debug!(client = %client_key, "new client registered");
        }

        match request {
            Request::Subscribe { torrent_id } => {
                self.handle_subscribe(client_key, torrent_key, torrent_id)
            }
            Request::Add {
                torrent_id,
                options,
            } => self.handle_add(client_key, torrent_key, torrent_id, options),
            Request::CreateServer { options } => {
                self.handle_create_server(client_key, torrent_key, options)
            }
            Request::Heartbeat => {
                // Liveness was refreshed above; nothing else to do.
            }
            Request::Destroy { options } => self.handle_destroy(client_key, options),
            Request::Unknown => {
                warn!(client = %client_key, "ignoring message with unknown type");
            }
        }
    }

    /// Process one engine session event, fanning it out to the
    /// session's current bindings in emission order.
    pub fn session_event(&mut self, hash: &InfoHash, event: SessionEvent) {
        let Some(session) = self.swarms.get_mut(hash) else {
            debug!(%hash, "dropping event for unknown session");
            return;
        };

        // Faults are relayed verbatim; snapshot-class events refresh
        // the cached snapshot first so the message reflects the event.
        if !matches!(
            event,
            SessionEvent::Warning(_) | SessionEvent::Error(_)
        ) {
            session.snapshot = session.handle.describe();
        }

        fanout::deliver(session, &event, &mut self.transport);
    }

    /// Relay an engine-wide (session-less) fault to every registered
    /// client.
    pub fn global_fault(&mut self, fault: FaultReport, fatal: bool) {
        warn!(message = %fault.message, fatal, "engine-wide fault");
        fanout::broadcast_global(&self.clients, fault, fatal, &mut self.transport);
    }

    /// Process the completion of a bridging-endpoint creation: resolve
    /// or reset the coalescer and notify every waiter exactly once.
    pub fn endpoint_ready(&mut self, hash: &InfoHash, outcome: Result<EndpointInfo, FaultReport>) {
        let (waiters, notification) = {
            let Some(session) = self.swarms.get_mut(hash) else {
                debug!(%hash, "dropping endpoint completion for unknown session");
                return;
            };
            match outcome {
                Ok(info) => {
                    info!(%hash, address = %info.address, "bridging endpoint ready");
                    let waiters = session.endpoint.resolve(info.clone());
                    (waiters, Notification::server_ready(&info))
                }
                Err(report) => {
                    warn!(%hash, message = %report.message, "bridging endpoint creation failed");
                    let waiters = session.endpoint.fail();
                    (waiters, Notification::Error { error: report })
                }
            }
        };

        for waiter in &waiters {
            self.transport.send(OutboundEnvelope::scoped(
                &waiter.client,
                &waiter.torrent_key,
                notification.clone(),
            ));
        }

        // The completion may have been the last thing keeping a
        // zero-binding session alive.
        self.settle_session(hash, false);
    }

    /// Read-only view of the client registry (used by the sweeper and
    /// by tests).
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Read-only view of the swarm registry.
    pub fn swarms(&self) -> &SwarmRegistry<E::Session> {
        &self.swarms
    }

    /// Mutable access to the injected transport (the server task uses
    /// this to maintain its routing table).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // -------------------------------------------------------------------------
    // Request handlers
    // -------------------------------------------------------------------------

    fn handle_subscribe(
        &mut self,
        client: ClientKey,
        torrent_key: Option<TorrentKey>,
        torrent_id: String,
    ) {
        let Some(key) = torrent_key else {
            warn!(client = %client, "dropping subscribe without torrentKey");
            return;
        };

        let hash = match self.engine.resolve(&torrent_id) {
            Ok(hash) => hash,
            Err(err) => {
                self.reject(&client, &key, err.to_string());
                return;
            }
        };

        // Subscribe never creates: absence is answered with `null` and
        // nothing changes.
        if !self.swarms.contains(&hash) {
            self.transport.send(OutboundEnvelope::scoped(
                &client,
                &key,
                Notification::Subscribed { torrent: None },
            ));
            return;
        }

        self.bind_and_reply(&hash, &client, &key, true);
    }

    fn handle_add(
        &mut self,
        client: ClientKey,
        torrent_key: Option<TorrentKey>,
        torrent_id: String,
        options: AddOptions,
    ) {
        let Some(key) = torrent_key else {
            warn!(client = %client, "dropping add without torrentKey");
            return;
        };

        let hash = match self.engine.resolve(&torrent_id) {
            Ok(hash) => hash,
            Err(err) => {
                self.reject(&client, &key, err.to_string());
                return;
            }
        };

        // Check key ownership before touching the engine, so a rejected
        // rebind cannot leave behind a session nobody is bound to.
        if let Some(owner) = self.swarms.hash_for_key(&client, &key) {
            if owner != &hash {
                warn!(client = %client, key = %key, %owner, "torrentKey already bound to a different torrent");
                self.reject(
                    &client,
                    &key,
                    "torrentKey already bound to a different torrent".to_string(),
                );
                return;
            }
        }

        let engine = &mut self.engine;
        let created = self.swarms.find_or_create(&hash, || {
            let handle = engine.open(&torrent_id, &options)?;
            let snapshot = handle.describe();
            Ok((handle, snapshot))
        });

        let existed = match created {
            Ok((_, existed)) => existed,
            Err(err) => {
                warn!(client = %client, %hash, error = %err, "engine refused to open session");
                self.reject(&client, &key, err.to_string());
                return;
            }
        };

        if !existed {
            info!(%hash, "session opened");
        }

        self.bind_and_reply(&hash, &client, &key, existed);

        if let Some(server_options) = options.server {
            self.request_endpoint(&hash, Binding::new(&client, &key), &server_options);
        }
    }

    fn handle_create_server(
        &mut self,
        client: ClientKey,
        torrent_key: Option<TorrentKey>,
        options: ServerOptions,
    ) {
        let Some(key) = torrent_key else {
            warn!(client = %client, "dropping create-server without torrentKey");
            return;
        };

        let Some(hash) = self.swarms.hash_for_key(&client, &key).cloned() else {
            self.reject(&client, &key, "unknown torrentKey".to_string());
            return;
        };

        self.request_endpoint(&hash, Binding::new(&client, &key), &options);
    }

    fn handle_destroy(&mut self, client: ClientKey, options: DestroyOptions) {
        let affected = self.swarms.remove_bindings_for_client(&client);
        self.clients.remove(&client);
        info!(client = %client, sessions = affected.len(), "client destroyed its subscriptions");

        for hash in affected {
            self.settle_session(&hash, options.immediate);
        }
    }

    // -------------------------------------------------------------------------
    // Shared internals (also used by the sweeper)
    // -------------------------------------------------------------------------

    /// Bind and send the `subscribed` reply. When the session predates
    /// this request, also synthesize the immediate identity + progress
    /// pair so the new subscriber does not wait for the next natural
    /// event.
    fn bind_and_reply(
        &mut self,
        hash: &InfoHash,
        client: &ClientKey,
        key: &TorrentKey,
        existed: bool,
    ) {
        match self.swarms.add_binding(hash, client, key) {
            Err(BindError::KeyBoundElsewhere(owner)) => {
                warn!(client = %client, key = %key, %owner, "torrentKey already bound to a different torrent");
                self.reject(client, key, "torrentKey already bound to a different torrent".to_string());
            }
            Err(err) => {
                warn!(client = %client, key = %key, error = %err, "binding failed");
            }
            Ok(_) => {
                let Some(session) = self.swarms.get(hash) else {
                    return;
                };
                self.transport.send(OutboundEnvelope::scoped(
                    client,
                    key,
                    Notification::Subscribed {
                        torrent: Some(session.snapshot.clone()),
                    },
                ));
                if existed {
                    fanout::welcome(session, &Binding::new(client, key), &mut self.transport);
                }
            }
        }
    }

    /// Route one endpoint request through the coalescer: serve from
    /// cache, join the in-flight creation, or perform the single start.
    fn request_endpoint(&mut self, hash: &InfoHash, waiter: Binding, options: &ServerOptions) {
        let Some(session) = self.swarms.get_mut(hash) else {
            warn!(%hash, "endpoint requested for unknown session");
            return;
        };

        let addressee = waiter.clone();
        match session.endpoint.request(waiter) {
            RequestOutcome::Ready(info) => {
                self.transport.send(OutboundEnvelope::scoped(
                    &addressee.client,
                    &addressee.torrent_key,
                    Notification::server_ready(&info),
                ));
            }
            RequestOutcome::Joined => {
                debug!(%hash, client = %addressee.client, "joined in-flight endpoint creation");
            }
            RequestOutcome::MustStart => {
                info!(%hash, "starting bridging endpoint");
                session.handle.start_endpoint(options);
            }
        }
    }

    /// Decide the fate of a session that may have just lost its last
    /// binding: tear it down now, or start/keep the drain grace.
    pub(crate) fn settle_session(&mut self, hash: &InfoHash, immediate: bool) {
        let now = self.clock.now();
        let destroy_now = {
            let Some(session) = self.swarms.get_mut(hash) else {
                return;
            };
            if !session.bindings.is_empty() {
                return;
            }
            // A pending endpoint creation always defers teardown.
            if session.endpoint.is_pending() {
                if matches!(session.phase, Phase::Active) {
                    session.phase = Phase::Draining { since: now };
                }
                false
            } else if immediate
                || self.config.drain_grace.is_zero()
                || self.config.update_interval.is_zero()
            {
                true
            } else {
                if matches!(session.phase, Phase::Active) {
                    session.phase = Phase::Draining { since: now };
                }
                false
            }
        };

        if destroy_now {
            self.destroy_session(hash);
        }
    }

    /// Tear down one session; when it was the last, also tear down the
    /// shared engine instance.
    pub(crate) fn destroy_session(&mut self, hash: &InfoHash) {
        let Some(mut session) = self.swarms.remove(hash) else {
            return;
        };
        session.handle.close();
        info!(%hash, "session destroyed");

        if self.swarms.is_empty() {
            info!("last session gone; shutting down engine instance");
            self.engine.shutdown();
        }
    }

    /// Scoped `warning` for a request the coordinator could resolve to
    /// a requester but not honor.
    fn reject(&mut self, client: &ClientKey, key: &TorrentKey, message: String) {
        self.transport.send(OutboundEnvelope::scoped(
            client,
            key,
            Notification::Warning {
                error: FaultReport::new(message),
            },
        ));
    }
}
