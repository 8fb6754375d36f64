//! Outbound delivery seam.
//!
//! The coordinator hands every outbound envelope to a [`Transport`]
//! injected at construction. Delivery is fire-and-forget with no flow
//! control: a broadcast to N bindings performs N synchronous sends
//! within the same turn. Ordering and reliability are the transport
//! owner's responsibility.

use crate::messages::OutboundEnvelope;

pub trait Transport {
    fn send(&mut self, message: OutboundEnvelope);
}
