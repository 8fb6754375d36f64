//! relay-server
//!
//! Multi-client async TCP server hosting the swarm-relay coordinator.
//! Generic over the transfer engine; ships a simulated engine for
//! local runs and tests.

pub mod config;
pub mod server;
pub mod sim;
pub mod types;

// these are internal modules, not re-exported
mod conn;
mod coordinator_task;
