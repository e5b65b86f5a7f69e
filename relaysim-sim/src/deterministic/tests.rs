//! Scenario tests for the deterministic relay simulation.

use std::sync::Arc;

use relaysim_core::{FlowConfig, FlowId, GroundStation, RelayConfig};

use crate::deterministic::{
    BufferOccupancyInvariant, Invariant, InvariantViolation, PacketConservationInvariant,
    RelaySimulation, SimulationError, SimulationReport, SimulationState, Termination,
};
use crate::orbit::RelayOrbit;

const PACKET_BITS: u64 = 8192;

fn run(config: &RelayConfig) -> SimulationReport {
    let mut sim = RelaySimulation::new(config).unwrap();
    sim.add_invariant(Arc::new(BufferOccupancyInvariant::new()));
    sim.add_invariant(Arc::new(PacketConservationInvariant::new()));
    sim.execute().unwrap()
}

/// Realistic channel with both flows sending a short burst.
fn short_default_config(packets: u64) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.flows.a_to_b.max_packets = packets;
    config.flows.b_to_a.max_packets = packets;
    config
}

/// Single flow saturating a slow, noiseless uplink of the given capacity.
fn congested_config(capacity_bits: Option<u64>) -> RelayConfig {
    let mut config = RelayConfig::for_testing();
    config.links.uplink_a.rate_bps = 2e6;
    config.links.uplink_a.buffer_capacity_bits = capacity_bits;
    config.flows.a_to_b = FlowConfig {
        start_time_s: 0.0,
        interval_s: config.simulation.time_step_s,
        max_packets: 200,
    };
    config
}

#[test]
fn test_simulation_reproducibility() {
    let config = short_default_config(100);

    let report1 = run(&config);
    let report2 = run(&config);

    assert_eq!(report1, report2);
    assert_eq!(report1.seed, 42);
}

#[test]
fn test_different_seeds_diverge() {
    let mut config = short_default_config(50);
    let report1 = run(&config);

    config.simulation.seed = 7;
    let report2 = run(&config);

    assert_ne!(report1.a_to_b.delays_ms, report2.a_to_b.delays_ms);
}

#[test]
fn test_single_flow_delays_follow_path_timing() {
    let config = RelayConfig::for_testing();
    let mut sim = RelaySimulation::new(&config).unwrap();
    let report = sim.execute().unwrap();

    assert_eq!(report.termination, Termination::Drained);
    assert_eq!(report.a_to_b.sent, 5);
    assert_eq!(report.a_to_b.received, 5);
    assert_eq!(report.a_to_b.lost, 0);
    assert_eq!(report.b_to_a.sent, 0);

    // Uplink completes one tick after generation, the downlink starts on the
    // next tick and completes one tick later. The satellite adds processing
    // plus propagation from where it was when the uplink completed.
    let orbit = RelayOrbit::new(&config.orbit);
    let step = config.simulation.time_step_s;
    let processing = config.channel.processing_delay_mean_s();
    let flow = sim.flow(FlowId::AtoB);
    for (sent_at, delay) in flow.send_times().iter().zip(flow.delays()) {
        let propagation = orbit.propagation_delay(GroundStation::B, sent_at + step);
        let expected = 3.0 * step + processing + propagation;
        assert!(
            (delay - expected).abs() < 1e-6,
            "delay {delay} expected {expected}"
        );
    }
}

#[test]
fn test_ideal_channel_delay_is_smooth() {
    let report = run(&RelayConfig::for_testing());

    // Only the slow orbital drift changes the delay between packets
    assert!(report.a_to_b.mean_jitter_ms < 0.1);
    assert!(report.a_to_b.mean_delay_ms > 15.0);
    assert!(report.a_to_b.mean_delay_ms < 30.0);
}

#[test]
fn test_noise_sets_delay_spread_and_jitter() {
    let sigma = 0.0005_f64;
    let mut config = RelayConfig::for_testing();
    config.simulation.max_time_s = 30.0;
    config.channel.atmospheric_noise_std_s = sigma;
    config.channel.orbital_noise_std_s = sigma;
    config.flows.a_to_b = FlowConfig {
        start_time_s: 1.0,
        interval_s: 0.005,
        max_packets: 2000,
    };

    let report = run(&config);
    let flow = &report.a_to_b;
    assert_eq!(flow.received, 2000);

    // Two independent Gaussian terms per packet add up to one of
    // deviation sqrt(2) * sigma
    let combined_ms = (2.0 * sigma * sigma).sqrt() * 1000.0;
    // Consecutive delays differ by N(0, 2 * combined^2), whose mean
    // absolute value is sqrt(2 / pi) * sqrt(2) * combined
    let expected_jitter_ms = (2.0 / std::f64::consts::PI).sqrt() * 2.0_f64.sqrt() * combined_ms;

    assert!(
        (flow.std_delay_ms - combined_ms).abs() < 0.1,
        "std {} expected {combined_ms}",
        flow.std_delay_ms
    );
    assert!(
        (flow.mean_jitter_ms - expected_jitter_ms).abs() < 0.1,
        "jitter {} expected {expected_jitter_ms}",
        flow.mean_jitter_ms
    );
}

#[test]
fn test_huge_packets_do_not_overflow_buffers() {
    let mut config = RelayConfig::for_testing();
    config.simulation.packet_size_bits = u64::MAX / 2 + 1;
    config.links.set_buffer_capacity(Some(u64::MAX));
    config.flows.a_to_b = FlowConfig {
        start_time_s: 0.0,
        interval_s: 0.001,
        max_packets: 3,
    };
    assert!(config.validate().is_ok());

    let report = run(&config);
    let flow = &report.a_to_b;

    // One packet is transmitting, the second fills the buffer to half of
    // u64::MAX and the third would overflow it
    assert_eq!(flow.sent, 3);
    assert_eq!(flow.losses.uplink_buffer, 1);
    assert!(report.timed_out());
    assert!(flow.is_conserved());
    assert!(report.invariant_violations.is_empty());
}

#[test]
fn test_both_flows_drain() {
    let report = run(&short_default_config(100));

    assert_eq!(report.termination, Termination::Drained);
    assert!(report.success());
    for flow in FlowId::ALL {
        let flow_report = report.flow(flow);
        assert_eq!(flow_report.sent, 100);
        assert_eq!(flow_report.in_transit, 0);
        assert!(flow_report.is_conserved());
        // Default link rates keep paced traffic well below capacity
        assert_eq!(flow_report.losses.buffer(), 0);
    }
}

#[test]
fn test_conservation_at_timeout() {
    let mut config = RelayConfig::default();
    config.simulation.max_time_s = 2.5;

    let report = run(&config);

    assert!(report.timed_out());
    assert!(report.simulated_time_s > 2.5);
    assert!(report.invariant_violations.is_empty());
    for flow in FlowId::ALL {
        let flow_report = report.flow(flow);
        assert!(flow_report.sent > 0);
        assert!(flow_report.is_conserved());
        assert_eq!(flow_report.losses.total(), flow_report.lost);
    }
}

#[test]
fn test_zero_bit_error_rate_never_corrupts() {
    let mut config = short_default_config(200);
    config.channel.bit_error_rate = 0.0;

    let report = run(&config);

    for flow in FlowId::ALL {
        assert_eq!(report.flow(flow).losses.corruption(), 0);
        assert_eq!(report.flow(flow).received, 200);
    }
}

#[test]
fn test_corruption_rate_matches_bit_error_rate() {
    // Per-hop corruption probability of 30% for the default packet size
    let target = 0.3_f64;
    let mut config = RelayConfig::for_testing();
    config.channel.bit_error_rate = -(1.0 - target).ln() / PACKET_BITS as f64;
    config.flows.a_to_b = FlowConfig {
        start_time_s: 0.0,
        interval_s: 0.002,
        max_packets: 2000,
    };

    let report = run(&config);
    let flow = &report.a_to_b;
    assert_eq!(report.termination, Termination::Drained);
    assert_eq!(flow.losses.buffer(), 0);

    let uplink_rate = flow.losses.uplink_corruption as f64 / flow.sent as f64;
    let survivors = flow.sent - flow.losses.uplink_corruption;
    let downlink_rate = flow.losses.downlink_corruption as f64 / survivors as f64;

    assert!((uplink_rate - target).abs() < 0.05, "uplink {uplink_rate}");
    assert!((downlink_rate - target).abs() < 0.05, "downlink {downlink_rate}");
    assert_eq!(flow.received + flow.lost, flow.sent);
}

#[test]
fn test_smaller_buffers_lose_more() {
    let mut previous_lost = 0;
    for capacity_packets in [64, 16, 4, 1] {
        let report = run(&congested_config(Some(capacity_packets * PACKET_BITS)));
        let flow = &report.a_to_b;

        assert_eq!(flow.sent, 200);
        assert_eq!(flow.losses.corruption(), 0);
        assert_eq!(flow.losses.buffer(), flow.lost);
        assert!(
            flow.lost >= previous_lost,
            "capacity {capacity_packets}: lost {} < {previous_lost}",
            flow.lost
        );
        previous_lost = flow.lost;
    }
    assert!(previous_lost > 0);
}

#[test]
fn test_buffer_smaller_than_packet_drops_everything() {
    let report = run(&congested_config(Some(PACKET_BITS / 2)));

    assert_eq!(report.a_to_b.sent, 200);
    assert_eq!(report.a_to_b.received, 0);
    assert_eq!(report.a_to_b.losses.uplink_buffer, 200);
    assert_eq!(report.a_to_b.throughput_mbps, 0.0);
}

#[test]
fn test_unbounded_buffer_never_drops() {
    let report = run(&congested_config(None));

    assert_eq!(report.termination, Termination::Drained);
    assert_eq!(report.a_to_b.received, 200);
    assert_eq!(report.a_to_b.lost, 0);
}

#[test]
fn test_throughput_bounded_by_bottleneck() {
    let config = congested_config(Some(16 * PACKET_BITS));
    let report = run(&config);

    let bottleneck_mbps = config.links.uplink_a.rate_bps / 1e6;
    assert!(report.a_to_b.throughput_mbps > 0.0);
    assert!(report.a_to_b.throughput_mbps <= bottleneck_mbps);
}

#[test]
fn test_timeout_reported() {
    let mut config = RelayConfig::for_testing();
    config.simulation.max_time_s = 1.0;
    config.flows.a_to_b.max_packets = 1000;

    let report = run(&config);

    assert_eq!(report.termination, Termination::TimedOut);
    assert!(!report.success());
    assert!(report.a_to_b.sent < 1000);
}

#[test]
fn test_downlink_congestion_at_satellite() {
    let mut config = RelayConfig::for_testing();
    config.links.downlink_b.rate_bps = 2e6;
    config.links.downlink_b.buffer_capacity_bits = Some(2 * PACKET_BITS);
    config.flows.a_to_b = FlowConfig {
        start_time_s: 0.0,
        interval_s: config.simulation.time_step_s,
        max_packets: 200,
    };

    let report = run(&config);
    let flow = &report.a_to_b;

    assert!(flow.losses.downlink_buffer > 0);
    assert_eq!(flow.losses.uplink_buffer, 0);
    assert!(report.invariant_violations.is_empty());
}

#[test]
fn test_snapshot_tracks_in_transit_packets() {
    let mut sim = RelaySimulation::new(&congested_config(None)).unwrap();
    for _ in 0..50 {
        sim.tick().unwrap();
    }

    let state = sim.snapshot();
    let flow = state.flow(FlowId::AtoB).unwrap();
    assert_eq!(flow.sent, 50);
    assert!(flow.in_transit > 0);
    assert_eq!(flow.sent, flow.received + flow.lost + flow.in_transit);
    assert!(!state.is_quiescent());
}

struct AlwaysFails;

impl Invariant for AlwaysFails {
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation> {
        Err(InvariantViolation {
            invariant: self.name().to_string(),
            description: "always fails".to_string(),
            time: state.time,
        })
    }

    fn name(&self) -> &str {
        "AlwaysFails"
    }
}

#[test]
fn test_too_many_invariant_violations() {
    let mut sim = RelaySimulation::new(&RelayConfig::for_testing()).unwrap();
    sim.add_invariant(Arc::new(AlwaysFails));

    let result = sim.execute();
    assert!(matches!(
        result,
        Err(SimulationError::TooManyInvariantViolations { count: 10 })
    ));
}

#[test]
fn test_report_serializes_to_json() {
    let report = run(&RelayConfig::for_testing());
    let json = report.to_json().unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["seed"], 42);
    assert_eq!(parsed["termination"], "Drained");
    assert_eq!(parsed["a_to_b"]["received"], 5);
}
