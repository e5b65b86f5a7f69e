//! Reduction of per-flow samples into summary statistics.

use relaysim_core::FlowId;
use serde::{Deserialize, Serialize};

use crate::flow::{LossBreakdown, TrafficFlow};

/// Arithmetic mean, 0 for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation, 0 for fewer than two samples.
pub fn population_std_dev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let mean = mean(samples);
    let variance = samples
        .iter()
        .map(|sample| (sample - mean).powi(2))
        .sum::<f64>()
        / samples.len() as f64;
    variance.sqrt()
}

/// Mean absolute difference between consecutive samples, 0 for fewer than two.
pub fn mean_jitter(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let total: f64 = samples
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .sum();
    total / (samples.len() - 1) as f64
}

/// Final statistics of one flow.
///
/// Times are in milliseconds and throughput in megabits per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    /// Flow the statistics belong to
    pub flow: FlowId,
    /// Packets generated
    pub sent: u64,
    /// Packets delivered
    pub received: u64,
    /// Packets lost for any cause
    pub lost: u64,
    /// Packets still queued, transmitting or propagating when the run stopped
    pub in_transit: u64,
    /// Losses by cause
    pub losses: LossBreakdown,
    /// Lost packets as a percentage of sent packets
    pub loss_pct: f64,
    /// Mean one-way delay
    pub mean_delay_ms: f64,
    /// Population standard deviation of the one-way delay
    pub std_delay_ms: f64,
    /// Mean absolute difference between consecutive delays
    pub mean_jitter_ms: f64,
    /// Delivered payload over the simulated time
    pub throughput_mbps: f64,
    /// One-way delays in delivery order
    pub delays_ms: Vec<f64>,
}

impl FlowReport {
    /// Whether every sent packet is accounted for as received, lost or in transit.
    pub fn is_conserved(&self) -> bool {
        self.sent == self.received + self.lost + self.in_transit
    }
}

/// Turns the raw counters and samples of a flow into a [`FlowReport`].
#[derive(Debug, Clone, Copy)]
pub struct MetricsAggregator {
    packet_size_bits: u64,
}

impl MetricsAggregator {
    /// Creates an aggregator for packets of `packet_size_bits` bits.
    pub fn new(packet_size_bits: u64) -> Self {
        Self { packet_size_bits }
    }

    /// Summarizes a flow at the end of a run lasting `total_time` seconds.
    pub fn summarize(&self, flow: &TrafficFlow, in_transit: u64, total_time: f64) -> FlowReport {
        let delays = flow.delays();
        let throughput_bps = if total_time > 0.0 {
            flow.received() as f64 * self.packet_size_bits as f64 / total_time
        } else {
            0.0
        };

        FlowReport {
            flow: flow.id(),
            sent: flow.sent(),
            received: flow.received(),
            lost: flow.lost(),
            in_transit,
            losses: *flow.losses(),
            loss_pct: 100.0 * flow.lost() as f64 / flow.sent().max(1) as f64,
            mean_delay_ms: mean(delays) * 1000.0,
            std_delay_ms: population_std_dev(delays) * 1000.0,
            mean_jitter_ms: mean_jitter(delays) * 1000.0,
            throughput_mbps: throughput_bps / 1e6,
            delays_ms: delays.iter().map(|delay| delay * 1000.0).collect(),
        }
    }
}
