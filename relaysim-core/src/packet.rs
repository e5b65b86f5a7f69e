//! Packet and endpoint identifiers shared across the simulator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two ground stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroundStation {
    A,
    B,
}

impl fmt::Display for GroundStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroundStation::A => write!(f, "A"),
            GroundStation::B => write!(f, "B"),
        }
    }
}

/// Identifier of a traffic flow, named after its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FlowId {
    AtoB,
    BtoA,
}

impl FlowId {
    /// Both flows in the order the simulation services them.
    pub const ALL: [FlowId; 2] = [FlowId::AtoB, FlowId::BtoA];

    /// Returns string representation used in logs and packet ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowId::AtoB => "AtoB",
            FlowId::BtoA => "BtoA",
        }
    }

    /// Station the flow transmits from.
    pub fn source(&self) -> GroundStation {
        match self {
            FlowId::AtoB => GroundStation::A,
            FlowId::BtoA => GroundStation::B,
        }
    }

    /// Station the flow delivers to.
    pub fn destination(&self) -> GroundStation {
        match self {
            FlowId::AtoB => GroundStation::B,
            FlowId::BtoA => GroundStation::A,
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a generated packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    /// Flow that generated the packet
    pub flow: FlowId,
    /// 1-based sequence number within the flow
    pub sequence: u64,
    /// Simulated time of generation in seconds
    pub sent_at: f64,
}

impl Packet {
    /// Creates packet stamped with its generation time.
    pub fn new(flow: FlowId, sequence: u64, sent_at: f64) -> Self {
        Self {
            flow,
            sequence,
            sent_at,
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.flow, self.sequence)
    }
}
