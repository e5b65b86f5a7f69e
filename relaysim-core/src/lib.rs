//! Relaysim Core - Shared building blocks for the satellite relay simulator
//!
//! This crate provides the configuration model, packet and endpoint
//! identifiers, and logging setup used by the simulation engine and the
//! command-line interface.

pub mod config;
pub mod packet;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::{
    ChannelConfig, ConfigError, FlowConfig, FlowSetConfig, LinkConfig, LinkSetConfig,
    OrbitConfig, RelayConfig, SimulationConfig,
};
pub use packet::{FlowId, GroundStation, Packet};
