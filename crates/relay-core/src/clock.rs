//! Time source abstraction.
//!
//! The coordinator never reads the system clock directly; it takes time
//! from an injected [`Clock`] so liveness and drain-grace behavior are
//! deterministic under test.

use std::time::Instant;

pub trait Clock {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
