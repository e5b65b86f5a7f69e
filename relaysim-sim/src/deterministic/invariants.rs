//! Invariant checking framework for simulation validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::SimulationState;

/// Violation of a simulation invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Simulated time of the violation in seconds
    pub time: f64,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at t={:.6}s: {}",
            self.invariant, self.time, self.description
        )
    }
}

/// Trait for checking simulation invariants.
pub trait Invariant: Send + Sync {
    /// Checks if invariant holds for current state.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;
}

/// Ensures no link buffer holds more bits than its capacity.
#[derive(Debug, Default)]
pub struct BufferOccupancyInvariant;

impl BufferOccupancyInvariant {
    /// Creates buffer occupancy invariant.
    pub fn new() -> Self {
        Self
    }
}

impl Invariant for BufferOccupancyInvariant {
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation> {
        for link in &state.links {
            if let Some(capacity) = link.capacity_bits {
                if link.occupancy_bits > capacity {
                    return Err(InvariantViolation {
                        invariant: self.name().to_string(),
                        description: format!(
                            "{} holds {} bits, capacity {}",
                            link.name, link.occupancy_bits, capacity
                        ),
                        time: state.time,
                    });
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "BufferOccupancy"
    }
}

/// Ensures every sent packet is received, lost, or still in transit.
#[derive(Debug, Default)]
pub struct PacketConservationInvariant;

impl PacketConservationInvariant {
    /// Creates packet conservation invariant.
    pub fn new() -> Self {
        Self
    }
}

impl Invariant for PacketConservationInvariant {
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation> {
        for flow in &state.flows {
            let accounted = flow.received + flow.lost + flow.in_transit;
            if flow.sent != accounted {
                return Err(InvariantViolation {
                    invariant: self.name().to_string(),
                    description: format!(
                        "{} sent {} packets but {} received + {} lost + {} in transit",
                        flow.flow, flow.sent, flow.received, flow.lost, flow.in_transit
                    ),
                    time: state.time,
                });
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "PacketConservation"
    }
}
