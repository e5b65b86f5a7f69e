//! Point-in-time snapshot of the simulation for invariant checks.

use relaysim_core::FlowId;

/// Buffer and transmitter state of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkState {
    /// Link name, such as `uplink_A`
    pub name: &'static str,
    /// Bits currently buffered
    pub occupancy_bits: u64,
    /// Buffer capacity, `None` when unbounded
    pub capacity_bits: Option<u64>,
    /// Packets waiting in the buffer
    pub queued: usize,
    /// Whether a transmission is in progress
    pub transmitting: bool,
}

/// Counters of one flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowState {
    /// Flow identifier
    pub flow: FlowId,
    /// Packets generated
    pub sent: u64,
    /// Packets delivered
    pub received: u64,
    /// Packets lost
    pub lost: u64,
    /// Queued, transmitting or propagating packets of this flow
    pub in_transit: u64,
}

/// Current state of the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    /// Simulated time in seconds
    pub time: f64,
    /// Completed ticks
    pub ticks: u64,
    /// Every link in dispatch order
    pub links: Vec<LinkState>,
    /// Counters of both flows
    pub flows: Vec<FlowState>,
    /// Packets in the propagation table
    pub in_flight: usize,
}

impl SimulationState {
    /// Returns the counters of a flow.
    pub fn flow(&self, flow: FlowId) -> Option<&FlowState> {
        self.flows.iter().find(|state| state.flow == flow)
    }

    /// Returns the state of a link by name.
    pub fn link(&self, name: &str) -> Option<&LinkState> {
        self.links.iter().find(|state| state.name == name)
    }

    /// Whether every link is idle and nothing is propagating.
    pub fn is_quiescent(&self) -> bool {
        self.in_flight == 0
            && self
                .links
                .iter()
                .all(|link| link.queued == 0 && !link.transmitting)
    }
}
