//! Fixed-interval traffic generator and its delivery statistics.

use relaysim_core::{FlowConfig, FlowId, Packet};
use serde::{Deserialize, Serialize};

/// Reason a packet never reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossCause {
    /// Ground station uplink buffer was full
    UplinkBuffer,
    /// Bit errors on the uplink hop
    UplinkCorruption,
    /// Satellite downlink buffer was full
    DownlinkBuffer,
    /// Bit errors on the downlink hop
    DownlinkCorruption,
}

impl LossCause {
    /// Returns string representation of the cause for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            LossCause::UplinkBuffer => "uplink buffer full",
            LossCause::UplinkCorruption => "corrupted on uplink",
            LossCause::DownlinkBuffer => "downlink buffer full",
            LossCause::DownlinkCorruption => "corrupted on downlink",
        }
    }
}

/// Losses of one flow tallied by cause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossBreakdown {
    /// Rejected by the ground station uplink buffer
    pub uplink_buffer: u64,
    /// Corrupted between ground station and satellite
    pub uplink_corruption: u64,
    /// Rejected by the satellite downlink buffer
    pub downlink_buffer: u64,
    /// Corrupted between satellite and destination
    pub downlink_corruption: u64,
}

impl LossBreakdown {
    /// Counts one loss.
    pub fn record(&mut self, cause: LossCause) {
        match cause {
            LossCause::UplinkBuffer => self.uplink_buffer += 1,
            LossCause::UplinkCorruption => self.uplink_corruption += 1,
            LossCause::DownlinkBuffer => self.downlink_buffer += 1,
            LossCause::DownlinkCorruption => self.downlink_corruption += 1,
        }
    }

    /// Losses caused by full buffers.
    pub fn buffer(&self) -> u64 {
        self.uplink_buffer + self.downlink_buffer
    }

    /// Losses caused by bit errors.
    pub fn corruption(&self) -> u64 {
        self.uplink_corruption + self.downlink_corruption
    }

    /// All losses.
    pub fn total(&self) -> u64 {
        self.buffer() + self.corruption()
    }
}

/// Constant-rate packet generator with per-flow delivery bookkeeping.
///
/// The flow decides when to send. Outcomes are recorded by the simulation
/// loop, which is the only caller of the `record_*` methods.
#[derive(Debug, Clone)]
pub struct TrafficFlow {
    id: FlowId,
    interval: f64,
    max_packets: u64,
    last_send_time: f64,
    sent: u64,
    received: u64,
    lost: u64,
    losses: LossBreakdown,
    send_times: Vec<f64>,
    delays: Vec<f64>,
}

impl TrafficFlow {
    /// Creates a flow whose first packet is due at its start time.
    pub fn new(id: FlowId, config: &FlowConfig) -> Self {
        Self {
            id,
            interval: config.interval_s,
            max_packets: config.max_packets,
            last_send_time: config.start_time_s - config.interval_s,
            sent: 0,
            received: 0,
            lost: 0,
            losses: LossBreakdown::default(),
            send_times: Vec::new(),
            delays: Vec::new(),
        }
    }

    /// Returns the flow identifier.
    pub fn id(&self) -> FlowId {
        self.id
    }

    /// Packets generated so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Packets delivered to the destination station.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Packets lost to full buffers or corruption.
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Losses tallied by cause.
    pub fn losses(&self) -> &LossBreakdown {
        &self.losses
    }

    /// Generation times of every packet sent, in order.
    pub fn send_times(&self) -> &[f64] {
        &self.send_times
    }

    /// One-way delays in seconds, in delivery order.
    pub fn delays(&self) -> &[f64] {
        &self.delays
    }

    /// Whether the send budget is used up.
    pub fn is_exhausted(&self) -> bool {
        self.sent >= self.max_packets
    }

    /// Whether a packet is due at time `t`.
    pub fn should_send(&self, t: f64) -> bool {
        !self.is_exhausted() && t >= self.last_send_time + self.interval
    }

    /// Generates the next packet stamped with time `t`.
    pub fn send_packet(&mut self, t: f64) -> Packet {
        self.last_send_time = t;
        self.sent += 1;
        self.send_times.push(t);
        Packet::new(self.id, self.sent, t)
    }

    pub(crate) fn record_delivery(&mut self, delay: f64) {
        self.received += 1;
        self.delays.push(delay);
    }

    pub(crate) fn record_loss(&mut self, cause: LossCause) {
        self.lost += 1;
        self.losses.record(cause);
    }
}
