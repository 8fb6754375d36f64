//! Configuration for the relay TCP server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `RELAY_BIND_ADDR`            (default: "0.0.0.0")
//! - `RELAY_PORT`                 (default: "9300")
//! - `RELAY_MAX_CLIENTS`          (default: "1024")
//! - `RELAY_HEARTBEAT_TIMEOUT_MS` (default: "30000", 0 disables expiry)
//! - `RELAY_UPDATE_INTERVAL_MS`   (default: "1000", 0 disables the tick)
//! - `RELAY_DRAIN_GRACE_MS`       (default: "5000", 0 destroys at once)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use relay_core::coordinator::CoordinatorConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to.
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Client heartbeat timeout; 0 disables liveness expiry.
    pub heartbeat_timeout_ms: u64,

    /// Sweeper tick interval; 0 disables the periodic tick.
    pub update_interval_ms: u64,

    /// Grace before a zero-binding session is destroyed.
    pub drain_grace_ms: u64,
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults above.
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("RELAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = read_env_or_default("RELAY_PORT", 9300u16)?;
        let max_clients = read_env_or_default("RELAY_MAX_CLIENTS", 1024usize)?;
        let heartbeat_timeout_ms = read_env_or_default("RELAY_HEARTBEAT_TIMEOUT_MS", 30_000u64)?;
        let update_interval_ms = read_env_or_default("RELAY_UPDATE_INTERVAL_MS", 1_000u64)?;
        let drain_grace_ms = read_env_or_default("RELAY_DRAIN_GRACE_MS", 5_000u64)?;

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            heartbeat_timeout_ms,
            update_interval_ms,
            drain_grace_ms,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// The coordinator-side tunables.
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            heartbeat_timeout: Duration::from_millis(self.heartbeat_timeout_ms),
            update_interval: Duration::from_millis(self.update_interval_ms),
            drain_grace: Duration::from_millis(self.drain_grace_ms),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}")),
        Err(_) => Ok(default),
    }
}
