//! Liveness sweeper: the timer-driven turn.
//!
//! Each tick, in order:
//! 1. Expire clients silent beyond the heartbeat timeout and cascade
//!    the cleanup: unbind them everywhere, settle affected sessions.
//! 2. Destroy draining sessions whose grace has elapsed.
//! 3. Broadcast a periodic `update` progress snapshot to every binding
//!    of every surviving session, independent of what steps 1–2 did
//!    this tick.
//!
//! The sweeper is the only reclamation path besides an explicit
//! `destroy` message; there is no cancellation message.

use tracing::info;

use crate::clock::Clock;
use crate::engine::{TransferEngine, TransferSession};
use crate::fanout;
use crate::transport::Transport;

use crate::coordinator::Coordinator;

impl<E: TransferEngine, T: Transport, C: Clock> Coordinator<E, T, C> {
    /// Run one sweeper turn. The owner calls this on the configured
    /// update interval; it is never scheduled internally.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        // 1. Heartbeat expiry (disabled when the timeout is zero).
        if !self.config.heartbeat_timeout.is_zero() {
            for client in self.clients.sweep(now, self.config.heartbeat_timeout) {
                info!(client = %client, "expiring silent client");
                self.clients.remove(&client);
                for hash in self.swarms.remove_bindings_for_client(&client) {
                    self.settle_session(&hash, false);
                }
            }
        }

        // 2. Drained sessions past their grace.
        for hash in self.swarms.drained(now, self.config.drain_grace) {
            self.destroy_session(&hash);
        }

        // 3. Periodic progress broadcast to the survivors.
        for (_, session) in self.swarms.iter_mut() {
            session.snapshot.progress = session.handle.progress();
            fanout::update(session, &mut self.transport);
        }
    }
}
