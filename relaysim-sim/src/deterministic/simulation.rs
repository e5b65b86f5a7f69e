//! Core fixed-step engine for the two-hop relay.

use std::fmt;
use std::sync::Arc;

use relaysim_core::{ConfigError, FlowId, Packet, RelayConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::clock::{DeterministicRng, SimulationClock};
use super::invariants::{Invariant, InvariantViolation};
use super::state::{FlowState, LinkState, SimulationState};
use crate::channel::SatelliteChannel;
use crate::flow::{LossCause, TrafficFlow};
use crate::link::{InTransitPacket, Link};
use crate::metrics::{FlowReport, MetricsAggregator};
use crate::orbit::RelayOrbit;
use crate::propagation::PropagationTable;

/// Maximum number of invariant violations before stopping simulation.
const MAX_INVARIANT_VIOLATIONS: usize = 10;

/// Errors that can occur during simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration rejected before the first tick
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Too many invariant violations occurred
    #[error("Too many invariant violations: {count}")]
    TooManyInvariantViolations {
        /// Number of violations that occurred
        count: usize,
    },

    /// Report could not be encoded
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Every flow used its budget and the relay emptied
    Drained,
    /// The clock passed the maximum simulated time first
    TimedOut,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Drained => write!(f, "drained"),
            Termination::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Seed used for reproduction
    pub seed: u64,
    /// Simulated time when the run stopped, in seconds
    pub simulated_time_s: f64,
    /// Total ticks executed
    pub ticks: u64,
    /// Why the run stopped
    pub termination: Termination,
    /// Statistics of the flow from station A to station B
    pub a_to_b: FlowReport,
    /// Statistics of the flow from station B to station A
    pub b_to_a: FlowReport,
    /// Invariant violations recorded during the run
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationReport {
    /// Returns the report of one flow.
    pub fn flow(&self, flow: FlowId) -> &FlowReport {
        match flow {
            FlowId::AtoB => &self.a_to_b,
            FlowId::BtoA => &self.b_to_a,
        }
    }

    /// Whether the run hit the maximum simulated time.
    pub fn timed_out(&self) -> bool {
        self.termination == Termination::TimedOut
    }

    /// Whether the run drained without invariant violations.
    pub fn success(&self) -> bool {
        self.termination == Termination::Drained && self.invariant_violations.is_empty()
    }

    /// Encodes the report as pretty-printed JSON.
    ///
    /// # Errors
    /// - `SimulationError::Serialization` - If a value cannot be encoded
    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Simulation Report (seed: {})\n", self.seed));
        summary.push_str(&format!(
            "Simulated time: {:.3} s in {} steps ({})\n",
            self.simulated_time_s, self.ticks, self.termination
        ));

        for report in [&self.a_to_b, &self.b_to_a] {
            summary.push_str(&format!("\nFlow {}:\n", report.flow));
            summary.push_str(&format!(
                "  Sent: {}, Received: {}, Lost: {} ({:.3}%)\n",
                report.sent, report.received, report.lost, report.loss_pct
            ));
            summary.push_str(&format!(
                "  Mean delay: {:.3} ms | Std dev: {:.3} ms | Mean jitter: {:.3} ms\n",
                report.mean_delay_ms, report.std_delay_ms, report.mean_jitter_ms
            ));
            summary.push_str(&format!(
                "  Throughput: {:.6} Mbps\n",
                report.throughput_mbps
            ));
            summary.push_str(&format!(
                "  Losses: uplink buffer {}, uplink corruption {}, downlink buffer {}, downlink corruption {}\n",
                report.losses.uplink_buffer,
                report.losses.uplink_corruption,
                report.losses.downlink_buffer,
                report.losses.downlink_corruption
            ));
        }

        if !self.invariant_violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.invariant_violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary
    }
}

/// One direction of the relay: a flow, its uplink and the downlink to its
/// destination.
#[derive(Debug)]
struct RelayPath {
    flow: TrafficFlow,
    uplink: Link,
    downlink: Link,
}

impl RelayPath {
    fn record_loss(&mut self, packet: Packet, cause: LossCause, verbose: bool, now: f64) {
        self.flow.record_loss(cause);
        let link = match cause {
            LossCause::UplinkBuffer | LossCause::UplinkCorruption => self.uplink.name(),
            LossCause::DownlinkBuffer | LossCause::DownlinkCorruption => self.downlink.name(),
        };
        log_event(
            verbose,
            now,
            format_args!("{packet} lost on {link}: {}", cause.as_str()),
        );
    }
}

/// Deterministic fixed-step simulation of the two-hop satellite relay.
///
/// The simulation is the only mutator of its links, flows and propagation
/// table. Every tick runs the same stages in the same order, which together
/// with the single seeded generator makes runs reproducible.
pub struct RelaySimulation {
    packet_size_bits: u64,
    verbose: bool,
    clock: SimulationClock,
    rng: DeterministicRng,
    orbit: RelayOrbit,
    channel: SatelliteChannel,
    /// A-to-B path first, then B-to-A
    paths: [RelayPath; 2],
    in_flight: PropagationTable,
    metrics: MetricsAggregator,
    invariants: Vec<Arc<dyn Invariant>>,
    violations: Vec<InvariantViolation>,
}

impl RelaySimulation {
    /// Creates simulation seeded from the configuration.
    ///
    /// # Errors
    /// - `SimulationError::Config` - Configuration failed validation
    pub fn new(config: &RelayConfig) -> Result<Self, SimulationError> {
        Self::with_rng(config, DeterministicRng::from_seed(config.simulation.seed))
    }

    /// Creates simulation drawing from an explicitly provided generator.
    ///
    /// # Errors
    /// - `SimulationError::Config` - Configuration failed validation
    pub fn with_rng(config: &RelayConfig, rng: DeterministicRng) -> Result<Self, SimulationError> {
        config.validate()?;

        let sim = &config.simulation;
        let bits = sim.packet_size_bits;
        let fluctuation = config.channel.rate_fluctuation;
        let links = &config.links;

        let paths = [
            RelayPath {
                flow: TrafficFlow::new(FlowId::AtoB, &config.flows.a_to_b),
                uplink: Link::new("uplink_A", &links.uplink_a, bits, fluctuation),
                downlink: Link::new("downlink_B", &links.downlink_b, bits, fluctuation),
            },
            RelayPath {
                flow: TrafficFlow::new(FlowId::BtoA, &config.flows.b_to_a),
                uplink: Link::new("uplink_B", &links.uplink_b, bits, fluctuation),
                downlink: Link::new("downlink_A", &links.downlink_a, bits, fluctuation),
            },
        ];

        Ok(Self {
            packet_size_bits: bits,
            verbose: sim.verbose,
            clock: SimulationClock::new(sim.time_step_s, sim.max_time_s),
            rng,
            orbit: RelayOrbit::new(&config.orbit),
            channel: SatelliteChannel::new(&config.channel)?,
            paths,
            in_flight: PropagationTable::new(),
            metrics: MetricsAggregator::new(bits),
            invariants: Vec::new(),
            violations: Vec::new(),
        })
    }

    /// Returns the seed used for this simulation.
    pub fn simulation_seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Returns current simulated time in seconds.
    pub fn simulation_time(&self) -> f64 {
        self.clock.now()
    }

    /// Returns number of ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    /// Adds an invariant checked at the end of every tick.
    pub fn add_invariant(&mut self, invariant: Arc<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// Returns flow state for inspection.
    pub fn flow(&self, flow: FlowId) -> &TrafficFlow {
        &self.paths[path_index(flow)].flow
    }

    /// Whether both flows are exhausted and nothing is queued, transmitting
    /// or propagating.
    pub fn is_drained(&self) -> bool {
        self.in_flight.is_empty()
            && self.paths.iter().all(|path| {
                path.flow.is_exhausted() && path.uplink.is_idle() && path.downlink.is_idle()
            })
    }

    /// Runs ticks until the relay drains or the clock passes the maximum
    /// simulated time.
    ///
    /// # Errors
    /// - `SimulationError::TooManyInvariantViolations` - Too many invariant violations
    pub fn execute(&mut self) -> Result<SimulationReport, SimulationError> {
        info!(
            seed = self.simulation_seed(),
            step = self.clock.step(),
            bit_error_rate = self.channel.bit_error_rate(),
            "Starting relay simulation"
        );
        for path in &self.paths {
            for link in [&path.uplink, &path.downlink] {
                debug!(
                    link = link.name(),
                    rate_bps = link.nominal_rate_bps(),
                    capacity_bits = ?link.capacity_bits(),
                    "Link configured"
                );
            }
        }

        let termination = loop {
            if self.is_drained() {
                break Termination::Drained;
            }
            if self.clock.is_expired() {
                warn!(
                    time = self.clock.now(),
                    ticks = self.clock.ticks(),
                    "Maximum simulated time reached before the relay drained"
                );
                break Termination::TimedOut;
            }
            self.tick()?;
        };

        let report = self.generate_report(termination);
        info!(
            time = report.simulated_time_s,
            ticks = report.ticks,
            %termination,
            "Relay simulation finished"
        );
        Ok(report)
    }

    /// Executes one tick: generate, dispatch, resolve uplink completions,
    /// resolve downlink completions, deliver, check invariants, advance.
    ///
    /// # Errors
    /// - `SimulationError::TooManyInvariantViolations` - Too many invariant violations
    pub fn tick(&mut self) -> Result<(), SimulationError> {
        let now = self.clock.now();

        self.generate_packets(now);
        self.dispatch_transmissions(now);
        for index in 0..self.paths.len() {
            self.resolve_uplink(index, now);
        }
        for index in 0..self.paths.len() {
            self.resolve_downlink(index, now);
        }
        self.deliver_arrivals(now);
        self.check_invariants()?;

        self.clock.advance();
        Ok(())
    }

    /// Captures link and flow state for invariant checks.
    pub fn snapshot(&self) -> SimulationState {
        let links = self
            .paths
            .iter()
            .flat_map(|path| [&path.uplink, &path.downlink])
            .map(|link| LinkState {
                name: link.name(),
                occupancy_bits: link.occupancy_bits(),
                capacity_bits: link.capacity_bits(),
                queued: link.queue_len(),
                transmitting: link.active().is_some(),
            })
            .collect();

        let flows = self
            .paths
            .iter()
            .map(|path| FlowState {
                flow: path.flow.id(),
                sent: path.flow.sent(),
                received: path.flow.received(),
                lost: path.flow.lost(),
                in_transit: self.in_transit(path.flow.id()),
            })
            .collect();

        SimulationState {
            time: self.clock.now(),
            ticks: self.clock.ticks(),
            links,
            flows,
            in_flight: self.in_flight.len(),
        }
    }

    fn generate_packets(&mut self, now: f64) {
        for path in &mut self.paths {
            if !path.flow.should_send(now) {
                continue;
            }
            let packet = path.flow.send_packet(now);
            if !path.uplink.enqueue(InTransitPacket::new(packet)) {
                path.record_loss(packet, LossCause::UplinkBuffer, self.verbose, now);
            }
        }
    }

    fn dispatch_transmissions(&mut self, now: f64) {
        for path in &mut self.paths {
            path.uplink.start_transmission_if_idle(now, &mut self.rng);
        }
        for path in &mut self.paths {
            path.downlink.start_transmission_if_idle(now, &mut self.rng);
        }
    }

    /// Packet reached the satellite: add on-board and propagation delay,
    /// roll uplink corruption, hand over to the downlink.
    fn resolve_uplink(&mut self, index: usize, now: f64) {
        let path = &mut self.paths[index];
        let Some(tx) = path.uplink.process_completion(now) else {
            return;
        };
        let packet = tx.item.packet;

        let propagation = self
            .orbit
            .propagation_delay(packet.flow.destination(), now);
        let extra_delay = self.channel.sample_extra_delay(propagation, &mut self.rng);

        if self
            .channel
            .roll_corruption(self.packet_size_bits, &mut self.rng)
        {
            path.record_loss(packet, LossCause::UplinkCorruption, self.verbose, now);
            return;
        }

        let item = InTransitPacket::with_extra_delay(packet, extra_delay);
        if !path.downlink.enqueue(item) {
            path.record_loss(packet, LossCause::DownlinkBuffer, self.verbose, now);
        }
    }

    /// Packet left the satellite: roll downlink corruption, start propagating.
    fn resolve_downlink(&mut self, index: usize, now: f64) {
        let path = &mut self.paths[index];
        let Some(tx) = path.downlink.process_completion(now) else {
            return;
        };
        let packet = tx.item.packet;
        let extra_delay = tx.item.extra_delay.unwrap_or_default();

        if self
            .channel
            .roll_corruption(self.packet_size_bits, &mut self.rng)
        {
            path.record_loss(packet, LossCause::DownlinkCorruption, self.verbose, now);
            return;
        }

        self.in_flight
            .insert(now + extra_delay, packet, packet.flow.destination());
    }

    fn deliver_arrivals(&mut self, now: f64) {
        while let Some(record) = self.in_flight.pop_due(now) {
            let delay = record.one_way_delay();
            self.paths[path_index(record.flow())]
                .flow
                .record_delivery(delay);
            log_event(
                self.verbose,
                now,
                format_args!(
                    "{} arrived at {} delay={:.3} ms",
                    record.packet,
                    record.destination,
                    delay * 1000.0
                ),
            );
        }
    }

    /// Checks all invariants.
    fn check_invariants(&mut self) -> Result<(), SimulationError> {
        if self.invariants.is_empty() {
            return Ok(());
        }

        let state = self.snapshot();
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(&state) {
                debug!(%violation, "Invariant violated");
                self.violations.push(violation);

                if self.violations.len() >= MAX_INVARIANT_VIOLATIONS {
                    return Err(SimulationError::TooManyInvariantViolations {
                        count: self.violations.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Packets of a flow queued, transmitting or propagating.
    fn in_transit(&self, flow: FlowId) -> u64 {
        let on_links: usize = self
            .paths
            .iter()
            .map(|path| path.uplink.packets_of(flow) + path.downlink.packets_of(flow))
            .sum();
        (on_links + self.in_flight.packets_of(flow)) as u64
    }

    /// Generates simulation report.
    fn generate_report(&self, termination: Termination) -> SimulationReport {
        let total_time = self.clock.now();
        let summarize = |flow: FlowId| {
            self.metrics
                .summarize(self.flow(flow), self.in_transit(flow), total_time)
        };

        SimulationReport {
            seed: self.simulation_seed(),
            simulated_time_s: total_time,
            ticks: self.clock.ticks(),
            termination,
            a_to_b: summarize(FlowId::AtoB),
            b_to_a: summarize(FlowId::BtoA),
            invariant_violations: self.violations.clone(),
        }
    }
}

fn path_index(flow: FlowId) -> usize {
    match flow {
        FlowId::AtoB => 0,
        FlowId::BtoA => 1,
    }
}

/// Per-event trace line, promoted to `info` in verbose mode.
fn log_event(verbose: bool, now: f64, event: fmt::Arguments<'_>) {
    if verbose {
        info!("[{now:.6}] {event}");
    } else {
        trace!("[{now:.6}] {event}");
    }
}
