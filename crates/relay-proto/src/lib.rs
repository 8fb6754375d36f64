//! relay-proto
//!
//! Wire framing for the swarm relay: one JSON object per line, both
//! directions. The schema is the serde shape of the envelope types in
//! `relay-core`: camelCase fields (`clientKey`, `torrentKey`,
//! `torrentID`, ...) and a kebab-case `type` tag (`add`, `subscribe`,
//! `create-server`, `heartbeat`, `destroy` inbound; `subscribed`,
//! `identity`, `metadata`, `progress`, `done`, `update`,
//! `server-ready`, `warning`, `error` outbound).
//!
//! An unrecognized inbound `type` decodes to `Request::Unknown` rather
//! than failing, so the coordinator can log and drop it; only malformed
//! JSON or a missing envelope field is a [`ProtocolError`].

pub mod json_codec;

pub use json_codec::{
    decode_inbound, decode_outbound, encode_inbound, encode_outbound, ProtocolError,
};
