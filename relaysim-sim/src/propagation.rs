//! Packets that left their final link and are still propagating.
//!
//! Records are kept in a min-heap by arrival time, so extracting the packets
//! due on a tick costs O(log n) each instead of a rescan of the whole table.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use relaysim_core::{FlowId, GroundStation, Packet};

/// Tolerance applied when comparing arrival times with the accumulated clock.
pub const ARRIVAL_EPSILON: f64 = 1e-12;

/// Packet in flight towards a ground station.
#[derive(Debug, Clone, Copy)]
pub struct PropagationRecord {
    /// Simulated arrival time in seconds
    pub arrival_time: f64,
    /// Packet in flight
    pub packet: Packet,
    /// Station the packet arrives at
    pub destination: GroundStation,
    /// Insertion order, breaks ties between equal arrival times
    sequence: u64,
}

impl PropagationRecord {
    /// Flow whose statistics receive this packet.
    pub fn flow(&self) -> FlowId {
        self.packet.flow
    }

    /// One-way delay from generation to arrival.
    pub fn one_way_delay(&self) -> f64 {
        self.arrival_time - self.packet.sent_at
    }
}

impl Eq for PropagationRecord {}

impl PartialEq for PropagationRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for PropagationRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior: earliest arrival, then earliest insertion
        match self.arrival_time.total_cmp(&other.arrival_time) {
            Ordering::Equal => self.sequence.cmp(&other.sequence).reverse(),
            other => other.reverse(),
        }
    }
}

impl PartialOrd for PropagationRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered table of in-flight packets.
#[derive(Debug, Default)]
pub struct PropagationTable {
    heap: BinaryHeap<PropagationRecord>,
    next_sequence: u64,
}

impl PropagationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns number of packets in flight.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Earliest pending arrival time.
    pub fn next_arrival(&self) -> Option<f64> {
        self.heap.peek().map(|record| record.arrival_time)
    }

    /// Counts in-flight packets of a flow.
    pub fn packets_of(&self, flow: FlowId) -> usize {
        self.heap
            .iter()
            .filter(|record| record.flow() == flow)
            .count()
    }

    /// Adds a packet that will arrive at `arrival_time`.
    pub fn insert(&mut self, arrival_time: f64, packet: Packet, destination: GroundStation) {
        self.heap.push(PropagationRecord {
            arrival_time,
            packet,
            destination,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }

    /// Removes and returns the earliest record if it has arrived by `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<PropagationRecord> {
        match self.heap.peek() {
            Some(record) if record.arrival_time <= now + ARRIVAL_EPSILON => self.heap.pop(),
            _ => None,
        }
    }
}
