//! Deterministic simulation of the relay.
//!
//! Every run is driven by one fixed-step clock and one seeded generator.
//! Identical configuration and seed produce identical packet outcomes,
//! which makes loss and delay figures reproducible across machines.

mod clock;
mod invariants;
mod simulation;
mod state;

#[cfg(test)]
mod tests;

pub use clock::{DeterministicRng, SimulationClock};
pub use invariants::{
    BufferOccupancyInvariant, Invariant, InvariantViolation, PacketConservationInvariant,
};
pub use simulation::{RelaySimulation, SimulationError, SimulationReport, Termination};
pub use state::{FlowState, LinkState, SimulationState};
