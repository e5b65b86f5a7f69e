//! Relaysim Simulation Engine - Deterministic two-hop satellite relay model

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Two ground stations exchange fixed-size packets through one satellite in
//! a circular orbit. Each packet crosses an uplink to the satellite and a
//! downlink to the other station, and can be lost to a full buffer or to bit
//! errors on either hop.
//!
//! # Features
//!
//! - **Deterministic Execution**: Same configuration and seed always produce identical results
//! - **Fixed-Step Loop**: Every tick runs the same ordered stages
//! - **Channel Model**: Rate fluctuation, bit errors, processing delay and Gaussian noise
//! - **Orbital Geometry**: Propagation delay follows the moving satellite
//! - **Invariant Checking**: Buffer bounds and packet conservation validated per tick
//!
//! # Example
//!
//! ```rust,no_run
//! use relaysim_core::RelayConfig;
//! use relaysim_sim::RelaySimulation;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::default();
//! let mut sim = RelaySimulation::new(&config)?;
//!
//! let report = sim.execute()?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod deterministic;
pub mod flow;
pub mod link;
pub mod metrics;
pub mod orbit;
pub mod propagation;

use std::sync::Arc;

pub use channel::SatelliteChannel;
pub use deterministic::{
    BufferOccupancyInvariant, DeterministicRng, FlowState, Invariant, InvariantViolation,
    LinkState, PacketConservationInvariant, RelaySimulation, SimulationClock, SimulationError,
    SimulationReport, SimulationState, Termination,
};
pub use flow::{LossBreakdown, LossCause, TrafficFlow};
pub use link::{InTransitPacket, Link};
pub use metrics::{FlowReport, MetricsAggregator};
pub use orbit::{Position, RelayOrbit};
pub use propagation::{PropagationRecord, PropagationTable};
use relaysim_core::RelayConfig;

/// Creates a simulation with the standard invariants installed.
///
/// # Errors
///
/// - `SimulationError::Config` - Invalid configuration
pub fn create_checked_simulation(config: &RelayConfig) -> Result<RelaySimulation> {
    let mut sim = RelaySimulation::new(config)?;
    sim.add_invariant(Arc::new(BufferOccupancyInvariant::new()));
    sim.add_invariant(Arc::new(PacketConservationInvariant::new()));
    Ok(sim)
}

/// Runs a checked simulation to completion.
///
/// # Errors
///
/// - `SimulationError::Config` - Invalid configuration
/// - `SimulationError::TooManyInvariantViolations` - Engine state became inconsistent
pub fn run_simulation(config: &RelayConfig) -> Result<SimulationReport> {
    create_checked_simulation(config)?.execute()
}

/// Common simulation error type for convenience.
pub type Result<T> = std::result::Result<T, SimulationError>;
