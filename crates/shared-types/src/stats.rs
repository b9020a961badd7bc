//! # Node Statistics
//!
//! The per-node record the gossip core writes into while it runs: byte
//! counters per message kind, latency means and block/fork counts. Reporting
//! is left to whoever owns the record.

use serde::{Deserialize, Serialize};

use crate::entities::NodeId;

/// Incrementally maintained arithmetic mean.
///
/// Folding sample `x` as the `n`-th observation gives
/// `mean = (mean * (n - 1) + x) / n`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningMean {
    mean: f64,
    count: u64,
}

impl RunningMean {
    pub fn fold(&mut self, sample: f64) {
        self.count += 1;
        let n = self.count as f64;
        self.mean = (self.mean * (n - 1.0) + sample) / n;
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Byte counters for one message kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteCounter {
    pub sent: u64,
    pub received: u64,
}

/// Statistics gathered by one node over a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatistics {
    pub node_id: NodeId,
    /// `NodeRole::code()` of the node.
    pub node_type: u8,
    pub connections: usize,

    // Block timing
    pub mean_block_receive_time: f64,
    pub mean_block_propagation_time: f64,
    pub mean_block_size: f64,

    // Chain shape
    pub total_blocks: u64,
    pub blocks_in_forks: u64,
    pub longest_fork: u64,
    pub block_timeouts: u64,

    // Traffic per message kind
    pub inv: ByteCounter,
    pub get_headers: ByteCounter,
    pub headers: ByteCounter,
    pub get_data: ByteCounter,
    pub block: ByteCounter,

    // Transactions
    pub node_generated_transaction: u64,
    pub mean_endorsement_time: f64,
    pub mean_ordering_time: f64,
    pub mean_validation_time: f64,
    pub mean_latency: f64,
}

impl NodeStatistics {
    pub fn new(node_id: NodeId, node_type: u8) -> Self {
        Self {
            node_id,
            node_type,
            ..Self::default()
        }
    }

    pub fn total_sent_bytes(&self) -> u64 {
        [self.inv, self.get_headers, self.headers, self.get_data, self.block]
            .iter()
            .map(|c| c.sent)
            .sum()
    }

    pub fn total_received_bytes(&self) -> u64 {
        [self.inv, self.get_headers, self.headers, self.get_data, self.block]
            .iter()
            .map(|c| c.received)
            .sum()
    }
}
