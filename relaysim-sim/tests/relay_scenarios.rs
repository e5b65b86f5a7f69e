//! End-to-end relay scenarios through the public API.

use relaysim_core::{FlowConfig, FlowId, RelayConfig};
use relaysim_sim::{Termination, run_simulation};

#[test]
fn test_default_relay_short_run() {
    let mut config = RelayConfig::default();
    config.flows.a_to_b.max_packets = 300;
    config.flows.b_to_a.max_packets = 300;

    let report = run_simulation(&config).unwrap();

    assert_eq!(report.termination, Termination::Drained);
    assert!(report.invariant_violations.is_empty());
    for flow in FlowId::ALL {
        let flow_report = report.flow(flow);
        assert_eq!(flow_report.sent, 300);
        assert_eq!(flow_report.received + flow_report.lost, 300);
        assert_eq!(flow_report.delays_ms.len() as u64, flow_report.received);
        // Noise can shave a delay towards zero but propagation dominates
        assert!(flow_report.mean_delay_ms > 10.0);
    }
}

#[test]
fn test_json_config_reproduces_report() {
    let mut config = RelayConfig::default();
    config.flows.a_to_b.max_packets = 50;
    config.flows.b_to_a = FlowConfig::silent();

    let json = serde_json::to_string(&config).unwrap();
    let reloaded = RelayConfig::from_json_str(&json).unwrap();

    let original = run_simulation(&config).unwrap();
    let replayed = run_simulation(&reloaded).unwrap();
    assert_eq!(original.a_to_b.received, replayed.a_to_b.received);
    assert_eq!(original.a_to_b.losses, replayed.a_to_b.losses);
    assert_eq!(original.ticks, replayed.ticks);
}

#[test]
fn test_saturated_relay_loses_at_uplink() {
    let mut config = RelayConfig::default();
    config.channel.bit_error_rate = 0.0;
    config.flows.a_to_b = FlowConfig {
        start_time_s: 0.0,
        interval_s: config.simulation.time_step_s,
        max_packets: 500,
    };
    config.flows.b_to_a = FlowConfig::silent();
    config.links.uplink_a.rate_bps = 4e6;

    let report = run_simulation(&config).unwrap();
    let flow = report.flow(FlowId::AtoB);

    assert!(flow.losses.uplink_buffer > 0);
    assert_eq!(flow.losses.corruption(), 0);
    assert!(flow.is_conserved());
    assert!(flow.throughput_mbps <= 4.0 * (1.0 + config.channel.rate_fluctuation));
}
