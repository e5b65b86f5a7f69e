//! Directional link with a bounded FIFO buffer and a single transmitter.
//!
//! Enqueue, dispatch and completion are separate calls so the simulation can
//! drive every link the same way on every tick. Buffer rejection is reported
//! to the caller; the link never counts losses itself.

use std::collections::VecDeque;

use relaysim_core::{FlowId, LinkConfig, Packet};

use crate::deterministic::DeterministicRng;

/// Floor applied to the sampled effective rate in bits per second.
pub const MIN_EFFECTIVE_RATE_BPS: f64 = 1e3;

/// Packet travelling through the relay.
///
/// Uplink queues carry packets without an extra delay. Once the satellite has
/// processed a packet, the delay it adds (processing, propagation and noise)
/// travels with it through the downlink queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InTransitPacket {
    /// Packet being relayed
    pub packet: Packet,
    /// Delay in seconds to apply after the final transmission completes
    pub extra_delay: Option<f64>,
}

impl InTransitPacket {
    /// Wraps a freshly generated packet.
    pub fn new(packet: Packet) -> Self {
        Self {
            packet,
            extra_delay: None,
        }
    }

    /// Wraps a packet processed by the satellite.
    pub fn with_extra_delay(packet: Packet, extra_delay: f64) -> Self {
        Self {
            packet,
            extra_delay: Some(extra_delay),
        }
    }
}

/// Transmission in progress or just completed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transmission {
    /// Packet on the wire
    pub item: InTransitPacket,
    /// Simulated time the last bit leaves the transmitter
    pub finishes_at: f64,
    /// Sampled rate for this transmission in bits per second
    pub effective_rate_bps: f64,
}

/// Directional channel between a ground station and the satellite.
#[derive(Debug, Clone)]
pub struct Link {
    name: &'static str,
    nominal_rate_bps: f64,
    rate_fluctuation: f64,
    capacity_bits: Option<u64>,
    packet_size_bits: u64,
    queue: VecDeque<InTransitPacket>,
    occupancy_bits: u64,
    active: Option<Transmission>,
}

impl Link {
    /// Creates an idle, empty link.
    ///
    /// `rate_fluctuation` is the fraction by which each transmission's rate
    /// may deviate from nominal in either direction.
    pub fn new(
        name: &'static str,
        config: &LinkConfig,
        packet_size_bits: u64,
        rate_fluctuation: f64,
    ) -> Self {
        Self {
            name,
            nominal_rate_bps: config.rate_bps,
            rate_fluctuation,
            capacity_bits: config.buffer_capacity_bits,
            packet_size_bits,
            queue: VecDeque::new(),
            occupancy_bits: 0,
            active: None,
        }
    }

    /// Returns the link name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns nominal bit rate.
    pub fn nominal_rate_bps(&self) -> f64 {
        self.nominal_rate_bps
    }

    /// Returns buffer capacity in bits, `None` when unbounded.
    pub fn capacity_bits(&self) -> Option<u64> {
        self.capacity_bits
    }

    /// Returns bits currently queued.
    pub fn occupancy_bits(&self) -> u64 {
        self.occupancy_bits
    }

    /// Returns number of queued packets.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns the transmission in progress, if any.
    pub fn active(&self) -> Option<&Transmission> {
        self.active.as_ref()
    }

    /// Whether the queue is empty and nothing is being transmitted.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active.is_none()
    }

    /// Counts packets of a flow queued or being transmitted on this link.
    pub fn packets_of(&self, flow: FlowId) -> usize {
        let queued = self
            .queue
            .iter()
            .filter(|item| item.packet.flow == flow)
            .count();
        let transmitting = self
            .active
            .iter()
            .filter(|tx| tx.item.packet.flow == flow)
            .count();
        queued + transmitting
    }

    /// Admits a packet at the tail of the queue if it fits in the buffer.
    ///
    /// Returns `false` without changing any state when the packet would push
    /// occupancy past capacity, or past `u64::MAX` bits.
    pub fn enqueue(&mut self, item: InTransitPacket) -> bool {
        let Some(occupancy) = self.occupancy_bits.checked_add(self.packet_size_bits) else {
            return false;
        };
        if self.capacity_bits.is_some_and(|capacity| occupancy > capacity) {
            return false;
        }

        self.queue.push_back(item);
        self.occupancy_bits = occupancy;
        true
    }

    /// Starts transmitting the head of the queue when the link is idle.
    ///
    /// Samples the effective rate for this transmission from `rng`. Draws
    /// nothing and returns `false` when busy or empty.
    pub fn start_transmission_if_idle(&mut self, time: f64, rng: &mut DeterministicRng) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(item) = self.queue.pop_front() else {
            return false;
        };
        self.occupancy_bits -= self.packet_size_bits;

        let fluctuation = 1.0 + rng.uniform(-self.rate_fluctuation, self.rate_fluctuation);
        let effective_rate_bps = (self.nominal_rate_bps * fluctuation).max(MIN_EFFECTIVE_RATE_BPS);
        let duration = self.packet_size_bits as f64 / effective_rate_bps;

        self.active = Some(Transmission {
            item,
            finishes_at: time + duration,
            effective_rate_bps,
        });
        true
    }

    /// Completes the active transmission once its finish time has passed.
    pub fn process_completion(&mut self, time: f64) -> Option<Transmission> {
        match self.active {
            Some(tx) if time >= tx.finishes_at => self.active.take(),
            _ => None,
        }
    }
}
