//! Encode/decode between envelope types and JSON lines.
//!
//! The functions are direction-symmetric because both ends of the
//! relay use them: the server decodes inbound and encodes outbound,
//! a client does the reverse.

use relay_core::messages::{InboundEnvelope, OutboundEnvelope};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line was not a valid JSON envelope.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The line was empty or whitespace.
    #[error("empty frame")]
    Empty,
}

/// Decode one client-to-coordinator line.
pub fn decode_inbound(line: &str) -> Result<InboundEnvelope, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(serde_json::from_str(line)?)
}

/// Decode one coordinator-to-client line.
pub fn decode_outbound(line: &str) -> Result<OutboundEnvelope, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(serde_json::from_str(line)?)
}

/// Encode a client-to-coordinator envelope (no trailing newline).
pub fn encode_inbound(envelope: &InboundEnvelope) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Encode a coordinator-to-client envelope (no trailing newline).
pub fn encode_outbound(envelope: &OutboundEnvelope) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(envelope)?)
}
