//! # Node Runtime Library
//!
//! Discrete-event runtime that hosts one gossip session per simulated node.
//! The `gossip-sim` binary is a thin wrapper around [`Simulation::run`].
//!
//! ## Modules
//!
//! - `config`: `SimulationConfig`, defaults and `GL_*` environment overrides
//! - `scheduler`: `EventQueue`, time-ordered events and node timers
//! - `network`: `SimulatedNetwork`, latency, bandwidth and chunked delivery
//! - `simulation`: `Simulation`, topology, mining and the event loop

#![allow(clippy::type_complexity)]

pub mod config;
pub mod network;
pub mod scheduler;
pub mod simulation;

pub use config::{ConfigError, SimulationConfig};
pub use network::{Delivery, NetworkConfig, SimulatedNetwork, TrafficStats};
pub use scheduler::{EventKey, EventQueue, ScheduledEvent};
pub use simulation::{Simulation, SimulationReport, SimulationStats};
