//! Simulated transfer engine.
//!
//! The real engine is an external collaborator; this one exists so the
//! binary runs end-to-end without it and so the integration tests can
//! drive a full TCP round trip. It emits a synthetic event sequence
//! per session (identity → metadata → progress → done) on timers, and
//! `create-server` binds a throwaway listener that reports its address
//! and serves nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use relay_core::engine::{SessionEvent, TransferEngine, TransferSession};
use relay_core::error::EngineError;
use relay_core::keys::InfoHash;
use relay_core::messages::{
    AddOptions, EndpointInfo, FaultReport, FileEntry, ServerOptions, TorrentSnapshot,
    TransferProgress,
};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::types::{Turn, TurnTx};

const SIMULATED_LENGTH: u64 = 16 * 1024 * 1024;
const PROGRESS_STEP: f64 = 0.05;
const PROGRESS_PERIOD: Duration = Duration::from_millis(250);

pub struct SimEngine {
    turns: TurnTx,
}

impl SimEngine {
    pub fn new(turns: TurnTx) -> Self {
        SimEngine { turns }
    }
}

impl TransferEngine for SimEngine {
    type Session = SimSession;

    fn resolve(&self, torrent_id: &str) -> Result<InfoHash, EngineError> {
        parse_info_hash(torrent_id)
            .ok_or_else(|| EngineError::InvalidTorrentId(torrent_id.to_string()))
    }

    fn open(&mut self, torrent_id: &str, _options: &AddOptions) -> Result<SimSession, EngineError> {
        let hash = self.resolve(torrent_id)?;
        let state = Arc::new(SimState::new(hash.clone()));

        tokio::spawn(drive(state.clone(), hash.clone(), self.turns.clone()));

        Ok(SimSession {
            hash,
            state,
            turns: self.turns.clone(),
        })
    }

    fn shutdown(&mut self) {
        info!("simulated engine instance stopped");
    }
}

struct SimState {
    snapshot: Mutex<TorrentSnapshot>,
    closed: AtomicBool,
}

impl SimState {
    fn new(hash: InfoHash) -> Self {
        SimState {
            snapshot: Mutex::new(TorrentSnapshot {
                info_hash: hash,
                ..TorrentSnapshot::default()
            }),
            closed: AtomicBool::new(false),
        }
    }

    fn snapshot(&self) -> MutexGuard<'_, TorrentSnapshot> {
        match self.snapshot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub struct SimSession {
    hash: InfoHash,
    state: Arc<SimState>,
    turns: TurnTx,
}

impl TransferSession for SimSession {
    fn describe(&self) -> TorrentSnapshot {
        self.state.snapshot().clone()
    }

    fn progress(&self) -> TransferProgress {
        self.state.snapshot().progress.clone()
    }

    fn start_endpoint(&mut self, options: &ServerOptions) {
        let host = options.host.clone().unwrap_or_else(|| "127.0.0.1".to_string());
        let port = options.port.unwrap_or(0);
        let hash = self.hash.clone();
        let turns = self.turns.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            let outcome = match TcpListener::bind((host.as_str(), port)).await {
                Ok(listener) => match listener.local_addr() {
                    Ok(addr) => {
                        tokio::spawn(drain_listener(listener, state));
                        Ok(EndpointInfo {
                            url: format!("http://{addr}/{hash}"),
                            address: addr.to_string(),
                        })
                    }
                    Err(err) => Err(FaultReport::new(err.to_string())),
                },
                Err(err) => Err(FaultReport::new(err.to_string())),
            };
            let _ = turns.send(Turn::Endpoint { hash, outcome });
        });
    }

    fn close(&mut self) {
        self.state.closed.store(true, Ordering::Release);
        debug!(hash = %self.hash, "simulated session closed");
    }
}

/// Drive the synthetic event sequence for one session.
async fn drive(state: Arc<SimState>, hash: InfoHash, turns: TurnTx) {
    sleep(Duration::from_millis(50)).await;
    if state.is_closed() {
        return;
    }
    if turns
        .send(Turn::Session {
            hash: hash.clone(),
            event: SessionEvent::IdentityKnown,
        })
        .is_err()
    {
        return;
    }

    sleep(Duration::from_millis(100)).await;
    if state.is_closed() {
        return;
    }
    {
        let mut snapshot = state.snapshot();
        snapshot.name = Some(format!("sim-{}", hash));
        snapshot.length = Some(SIMULATED_LENGTH);
        snapshot.files = vec![FileEntry {
            name: format!("sim-{}.bin", hash),
            length: SIMULATED_LENGTH,
        }];
    }
    if turns
        .send(Turn::Session {
            hash: hash.clone(),
            event: SessionEvent::MetadataKnown,
        })
        .is_err()
    {
        return;
    }

    loop {
        sleep(PROGRESS_PERIOD).await;
        if state.is_closed() {
            return;
        }

        let done = {
            let mut snapshot = state.snapshot();
            let progress = &mut snapshot.progress;
            progress.progress = (progress.progress + PROGRESS_STEP).min(1.0);
            progress.downloaded = (progress.progress * SIMULATED_LENGTH as f64) as u64;
            progress.download_speed = SIMULATED_LENGTH as f64 * PROGRESS_STEP
                / PROGRESS_PERIOD.as_secs_f64();
            progress.num_peers = 4;
            let remaining = 1.0 - progress.progress;
            progress.time_remaining_ms = Some(
                (remaining / PROGRESS_STEP * PROGRESS_PERIOD.as_millis() as f64) as u64,
            );
            progress.progress >= 1.0
        };

        let event = if done {
            SessionEvent::Completed
        } else {
            SessionEvent::ProgressChanged
        };
        if turns
            .send(Turn::Session {
                hash: hash.clone(),
                event,
            })
            .is_err()
        {
            return;
        }
        if done {
            return;
        }
    }
}

/// Accept and immediately drop connections until the session closes.
/// Bridging content is out of scope; only the address matters here.
async fn drain_listener(listener: TcpListener, state: Arc<SimState>) {
    loop {
        if state.is_closed() {
            return;
        }
        match listener.accept().await {
            Ok((stream, _)) => drop(stream),
            Err(_) => return,
        }
    }
}

/// Extract the fingerprint from a magnet link or a bare hash string.
fn parse_info_hash(torrent_id: &str) -> Option<InfoHash> {
    let id = torrent_id.trim();
    let raw = if let Some(rest) = id.split_once("btih:").map(|(_, rest)| rest) {
        rest.split('&').next().unwrap_or(rest)
    } else {
        id
    };
    let raw = raw.trim();
    if raw.is_empty() || raw.contains(|c: char| c.is_whitespace()) {
        return None;
    }
    Some(InfoHash(raw.to_ascii_lowercase()))
}
