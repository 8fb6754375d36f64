//! Shared fixtures for the coordinator tests: a manual clock, a
//! recording transport and a stub engine, all inspectable through
//! `Rc` handles. The core is pure, so no runtime is involved.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use relay_core::clock::Clock;
use relay_core::coordinator::{Coordinator, CoordinatorConfig};
use relay_core::engine::{TransferEngine, TransferSession};
use relay_core::error::EngineError;
use relay_core::keys::{ClientKey, InfoHash, TorrentKey};
use relay_core::messages::{
    AddOptions, DestroyOptions, InboundEnvelope, Notification, OutboundEnvelope, Request,
    ServerOptions, TorrentSnapshot,
};
use relay_core::transport::Transport;

// -----------------------------------------------------------------------------
// Clock
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct TestClock(Rc<Cell<Instant>>);

impl TestClock {
    pub fn new() -> Self {
        TestClock(Rc::new(Cell::new(Instant::now())))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

// -----------------------------------------------------------------------------
// Transport
// -----------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingTransport(Rc<RefCell<Vec<OutboundEnvelope>>>);

impl RecordingTransport {
    pub fn new() -> Self {
        RecordingTransport::default()
    }

    /// Everything sent since the last call, in send order.
    pub fn take(&self) -> Vec<OutboundEnvelope> {
        self.0.borrow_mut().drain(..).collect()
    }

    /// Messages sent to one client, without draining.
    pub fn sent_to(&self, client: &ClientKey) -> Vec<OutboundEnvelope> {
        self.0
            .borrow()
            .iter()
            .filter(|e| &e.client_key == client)
            .cloned()
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, message: OutboundEnvelope) {
        self.0.borrow_mut().push(message);
    }
}

/// Short tag for a notification, for ordering assertions.
pub fn tag(envelope: &OutboundEnvelope) -> &'static str {
    match &envelope.notification {
        Notification::Subscribed { .. } => "subscribed",
        Notification::Identity { .. } => "identity",
        Notification::Metadata { .. } => "metadata",
        Notification::Progress { .. } => "progress",
        Notification::Done { .. } => "done",
        Notification::Update { .. } => "update",
        Notification::ServerReady { .. } => "server-ready",
        Notification::Warning { .. } => "warning",
        Notification::Error { .. } => "error",
    }
}

pub fn tags(envelopes: &[OutboundEnvelope]) -> Vec<&'static str> {
    envelopes.iter().map(tag).collect()
}

// -----------------------------------------------------------------------------
// Stub engine
// -----------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StubState {
    pub opens: u32,
    pub shutdowns: u32,
    pub closed: Vec<InfoHash>,
    pub endpoint_starts: Vec<InfoHash>,
    pub snapshots: HashMap<InfoHash, TorrentSnapshot>,
}

#[derive(Clone, Default)]
pub struct StubEngine(pub Rc<RefCell<StubState>>);

impl StubEngine {
    pub fn new() -> Self {
        StubEngine::default()
    }

    pub fn opens(&self) -> u32 {
        self.0.borrow().opens
    }

    pub fn shutdowns(&self) -> u32 {
        self.0.borrow().shutdowns
    }

    pub fn closed(&self) -> Vec<InfoHash> {
        self.0.borrow().closed.clone()
    }

    pub fn endpoint_starts(&self) -> Vec<InfoHash> {
        self.0.borrow().endpoint_starts.clone()
    }

    /// Simulate engine-side metadata arriving (call before delivering
    /// the corresponding event).
    pub fn set_name(&self, hash: &InfoHash, name: &str) {
        if let Some(snapshot) = self.0.borrow_mut().snapshots.get_mut(hash) {
            snapshot.name = Some(name.to_string());
        }
    }

    /// Simulate engine-side progress advancing.
    pub fn set_progress(&self, hash: &InfoHash, progress: f64) {
        if let Some(snapshot) = self.0.borrow_mut().snapshots.get_mut(hash) {
            snapshot.progress.progress = progress;
        }
    }
}

impl TransferEngine for StubEngine {
    type Session = StubSession;

    fn resolve(&self, torrent_id: &str) -> Result<InfoHash, EngineError> {
        let id = torrent_id.trim();
        if id.is_empty() {
            return Err(EngineError::InvalidTorrentId(torrent_id.to_string()));
        }
        Ok(InfoHash(id.to_ascii_lowercase()))
    }

    fn open(&mut self, torrent_id: &str, _options: &AddOptions) -> Result<StubSession, EngineError> {
        let hash = self.resolve(torrent_id)?;
        let mut state = self.0.borrow_mut();
        state.opens += 1;
        state.snapshots.insert(
            hash.clone(),
            TorrentSnapshot {
                info_hash: hash.clone(),
                ..TorrentSnapshot::default()
            },
        );
        Ok(StubSession {
            hash,
            state: self.0.clone(),
        })
    }

    fn shutdown(&mut self) {
        self.0.borrow_mut().shutdowns += 1;
    }
}

pub struct StubSession {
    hash: InfoHash,
    state: Rc<RefCell<StubState>>,
}

impl TransferSession for StubSession {
    fn describe(&self) -> TorrentSnapshot {
        self.state
            .borrow()
            .snapshots
            .get(&self.hash)
            .cloned()
            .unwrap_or_default()
    }

    fn progress(&self) -> relay_core::messages::TransferProgress {
        self.describe().progress
    }

    fn start_endpoint(&mut self, _options: &ServerOptions) {
        self.state.borrow_mut().endpoint_starts.push(self.hash.clone());
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        state.closed.push(self.hash.clone());
        state.snapshots.remove(&self.hash);
    }
}

// -----------------------------------------------------------------------------
// Fixture
// -----------------------------------------------------------------------------

pub struct Fixture {
    pub coordinator: Coordinator<StubEngine, RecordingTransport, TestClock>,
    pub engine: StubEngine,
    pub transport: RecordingTransport,
    pub clock: TestClock,
}

pub fn fixture(config: CoordinatorConfig) -> Fixture {
    let engine = StubEngine::new();
    let transport = RecordingTransport::new();
    let clock = TestClock::new();
    let coordinator = Coordinator::new(engine.clone(), transport.clone(), clock.clone(), config);
    Fixture {
        coordinator,
        engine,
        transport,
        clock,
    }
}

// -----------------------------------------------------------------------------
// Envelope builders
// -----------------------------------------------------------------------------

pub fn client(name: &str) -> ClientKey {
    ClientKey(name.to_string())
}

pub fn key(name: &str) -> TorrentKey {
    TorrentKey(name.to_string())
}

pub fn add(client: &ClientKey, key: &TorrentKey, torrent_id: &str) -> InboundEnvelope {
    InboundEnvelope {
        client_key: client.clone(),
        torrent_key: Some(key.clone()),
        request: Request::Add {
            torrent_id: torrent_id.to_string(),
            options: AddOptions::default(),
        },
    }
}

pub fn add_with_server(client: &ClientKey, key: &TorrentKey, torrent_id: &str) -> InboundEnvelope {
    InboundEnvelope {
        client_key: client.clone(),
        torrent_key: Some(key.clone()),
        request: Request::Add {
            torrent_id: torrent_id.to_string(),
            options: AddOptions {
                server: Some(ServerOptions::default()),
                ..AddOptions::default()
            },
        },
    }
}

pub fn subscribe(client: &ClientKey, key: &TorrentKey, torrent_id: &str) -> InboundEnvelope {
    InboundEnvelope {
        client_key: client.clone(),
        torrent_key: Some(key.clone()),
        request: Request::Subscribe {
            torrent_id: torrent_id.to_string(),
        },
    }
}

pub fn create_server(client: &ClientKey, key: &TorrentKey) -> InboundEnvelope {
    InboundEnvelope {
        client_key: client.clone(),
        torrent_key: Some(key.clone()),
        request: Request::CreateServer {
            options: ServerOptions::default(),
        },
    }
}

pub fn heartbeat(client: &ClientKey) -> InboundEnvelope {
    InboundEnvelope {
        client_key: client.clone(),
        torrent_key: None,
        request: Request::Heartbeat,
    }
}

pub fn destroy(client: &ClientKey, immediate: bool) -> InboundEnvelope {
    InboundEnvelope {
        client_key: client.clone(),
        torrent_key: None,
        request: Request::Destroy {
            options: DestroyOptions { immediate },
        },
    }
}
