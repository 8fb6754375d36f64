//! Message types exchanged between clients and the coordinator.
//!
//! These are **transport-agnostic** logical messages:
//! - [`InboundEnvelope`] / [`Request`]: what the coordinator consumes.
//! - [`OutboundEnvelope`] / [`Notification`]: what it produces.
//!
//! Everything here is a plain serializable record; no live session
//! objects ever cross this boundary. Field names and type tags follow
//! the original JSON protocol (`clientKey`, `torrentKey`, `torrentID`,
//! kebab-case `type` tags), so the serde derives double as the wire
//! schema. Framing lives in the `relay-proto` crate.

use serde::{Deserialize, Serialize};

use crate::keys::{ClientKey, InfoHash, TorrentKey};

/// A message from a client to the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEnvelope {
    /// Sender; every inbound message refreshes this client's liveness.
    pub client_key: ClientKey,

    /// Subscription scope. Required for everything except `heartbeat`
    /// and `destroy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_key: Option<TorrentKey>,

    /// The request itself, tagged by `type` on the wire.
    #[serde(flatten)]
    pub request: Request,
}

/// A message from the coordinator to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEnvelope {
    /// Addressee.
    pub client_key: ClientKey,

    /// Subscription scope; `None` for engine-wide broadcasts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_key: Option<TorrentKey>,

    #[serde(flatten)]
    pub notification: Notification,
}

/// Client-to-coordinator request, dispatched on the `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    /// Bind to an existing session; never creates one.
    Subscribe {
        #[serde(rename = "torrentID")]
        torrent_id: String,
    },

    /// Find-or-create the session for a torrent id, then bind.
    Add {
        #[serde(rename = "torrentID")]
        torrent_id: String,
        #[serde(default)]
        options: AddOptions,
    },

    /// Request the bridging endpoint for the session bound to the
    /// envelope's torrent key.
    CreateServer {
        #[serde(default)]
        options: ServerOptions,
    },

    /// Pure liveness refresh.
    Heartbeat,

    /// Drop every subscription of the sending client.
    Destroy {
        #[serde(default)]
        options: DestroyOptions,
    },

    /// Any unrecognized `type` tag. Logged and dropped by the
    /// coordinator; never an error.
    #[serde(other)]
    Unknown,
}

/// Coordinator-to-client notification, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notification {
    /// Reply to `subscribe`/`add`: current snapshot, or `null` when no
    /// session exists for the requested torrent.
    Subscribed { torrent: Option<TorrentSnapshot> },

    /// The session's fingerprint is known.
    Identity { torrent: TorrentSnapshot },

    /// Name, length and file list are known.
    Metadata { torrent: TorrentSnapshot },

    /// Transfer progress changed.
    Progress { progress: TransferProgress },

    /// Transfer completed.
    Done { progress: TransferProgress },

    /// Periodic progress broadcast from the liveness sweeper.
    Update { progress: TransferProgress },

    /// The bridging endpoint for this subscription is reachable.
    ServerReady {
        #[serde(rename = "serverURL")]
        server_url: String,
        #[serde(rename = "serverAddress")]
        server_address: String,
    },

    /// Non-fatal fault, session-scoped or engine-wide.
    Warning { error: FaultReport },

    /// Fault, session-scoped or engine-wide.
    Error { error: FaultReport },
}

/// Options accepted by `add`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOptions {
    /// Extra tracker URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub announce: Vec<String>,

    /// Download path hint for the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// When present, also request the bridging endpoint as part of the
    /// add, as if a `create-server` followed immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerOptions>,
}

/// Options accepted by `create-server`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Options accepted by `destroy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyOptions {
    /// Skip the drain grace and tear down affected sessions at once.
    #[serde(default)]
    pub immediate: bool,
}

/// Read-only view of one session, as exposed to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentSnapshot {
    pub info_hash: InfoHash,

    /// Unknown until the `metadata` event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Total length in bytes; unknown until `metadata`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,

    #[serde(flatten)]
    pub progress: TransferProgress,
}

/// One file within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub length: u64,
}

/// Transfer progress fields, updated with every progress-class event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgress {
    /// Completion in `[0.0, 1.0]`.
    pub progress: f64,
    pub downloaded: u64,
    pub uploaded: u64,
    pub download_speed: f64,
    pub upload_speed: f64,
    pub num_peers: u32,

    /// Estimated time remaining; absent while unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_remaining_ms: Option<u64>,
}

/// Serializable fault description relayed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultReport {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl FaultReport {
    pub fn new(message: impl Into<String>) -> Self {
        FaultReport {
            message: message.into(),
            stack: None,
        }
    }
}

/// Result of a successful bridging-endpoint creation.
///
/// A plain record; the engine side owns the endpoint's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub url: String,
    pub address: String,
}

// -----------------------------------------------------------------------------
// Convenience constructors
// -----------------------------------------------------------------------------

impl OutboundEnvelope {
    /// Envelope scoped to one subscription.
    pub fn scoped(client: &ClientKey, key: &TorrentKey, notification: Notification) -> Self {
        OutboundEnvelope {
            client_key: client.clone(),
            torrent_key: Some(key.clone()),
            notification,
        }
    }

    /// Engine-wide envelope addressed to one client, with no
    /// subscription scope.
    pub fn global(client: &ClientKey, notification: Notification) -> Self {
        OutboundEnvelope {
            client_key: client.clone(),
            torrent_key: None,
            notification,
        }
    }
}

impl Notification {
    pub fn server_ready(endpoint: &EndpointInfo) -> Self {
        Notification::ServerReady {
            server_url: endpoint.url.clone(),
            server_address: endpoint.address.clone(),
        }
    }
}
