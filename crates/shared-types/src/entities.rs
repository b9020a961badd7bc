//! # Core Domain Entities
//!
//! Defines the entities every gossip-ledger subsystem exchanges.
//!
//! ## Clusters
//!
//! - **Identity**: `NodeId`, `PeerId`, `BlockId`, `TransactionId`
//! - **Chain**: `Block`, `Transaction`
//!
//! Blocks and transactions serialize with camelCase field names because they
//! travel inside JSON gossip frames. Local bookkeeping (when a block arrived,
//! which peer delivered it) is skipped on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ParseBlockIdError;

/// Simulated time in seconds since the start of a run.
pub type SimTime = f64;

/// Numeric identity of a node in the simulated network.
pub type NodeId = u32;

/// Default serialized size of a transaction, in bytes.
pub const TRANSACTION_SIZE_BYTES: u64 = 100;

// =============================================================================
// IDENTITY
// =============================================================================

/// A connected peer, addressed by its node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub NodeId);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Identity of a block: `(height, miner_id)`.
///
/// Rendered as `"<height>/<minerId>"`, the inventory key used by `INV`,
/// `GET_HEADERS` and `GET_DATA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub height: u64,
    pub miner_id: NodeId,
}

impl BlockId {
    pub fn new(height: u64, miner_id: NodeId) -> Self {
        Self { height, miner_id }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.height, self.miner_id)
    }
}

impl FromStr for BlockId {
    type Err = ParseBlockIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (height, miner) = s
            .split_once('/')
            .ok_or_else(|| ParseBlockIdError::MissingSeparator(s.to_string()))?;
        let height = height
            .trim()
            .parse()
            .map_err(|_| ParseBlockIdError::InvalidHeight(height.to_string()))?;
        let miner_id = miner
            .trim()
            .parse()
            .map_err(|_| ParseBlockIdError::InvalidMiner(miner.to_string()))?;
        Ok(Self { height, miner_id })
    }
}

/// Identity of a transaction: the originating client and its local counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId {
    pub node_id: NodeId,
    pub trans_id: u64,
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.trans_id)
    }
}

// =============================================================================
// CHAIN
// =============================================================================

/// A transaction as gossiped between clients, endorsers and committers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Client that created the transaction.
    pub node_id: NodeId,
    /// Per-client sequence number, starting at 1.
    pub trans_id: u64,
    /// Simulated creation time.
    pub timestamp: SimTime,
    /// Whether a committer has seen it inside a block.
    #[serde(rename = "validation", default)]
    pub validated: bool,
    /// Endorser that executed it (0 until executed).
    #[serde(default)]
    pub execution: NodeId,
    #[serde(skip, default = "default_transaction_size")]
    pub size_bytes: u64,
}

fn default_transaction_size() -> u64 {
    TRANSACTION_SIZE_BYTES
}

impl Transaction {
    pub fn new(node_id: NodeId, trans_id: u64, timestamp: SimTime) -> Self {
        Self {
            node_id,
            trans_id,
            timestamp,
            validated: false,
            execution: 0,
            size_bytes: TRANSACTION_SIZE_BYTES,
        }
    }

    pub fn id(&self) -> TransactionId {
        TransactionId {
            node_id: self.node_id,
            trans_id: self.trans_id,
        }
    }

    /// Stamp the endorser that executed this transaction.
    pub fn set_execution(&mut self, endorser: NodeId) {
        self.execution = endorser;
    }

    pub fn mark_validated(&mut self) {
        self.validated = true;
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new(0, 0, 0.0)
    }
}

/// A block and its transaction payload.
///
/// The all-zero block is genesis: height 0, miner 0, no parent. It doubles as
/// the "empty" sentinel returned by ledger lookups that find nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub height: u64,
    pub miner_id: NodeId,
    pub nonce: u64,
    pub parent_miner_id: NodeId,
    pub size_bytes: u64,
    /// Simulated time the block was minted.
    pub timestamp: SimTime,
    /// Simulated time this node received it. Local only.
    #[serde(skip)]
    pub received_at: SimTime,
    /// Peer that delivered it, `None` for locally minted blocks. Local only.
    #[serde(skip)]
    pub origin: Option<PeerId>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(
        height: u64,
        miner_id: NodeId,
        nonce: u64,
        parent_miner_id: NodeId,
        size_bytes: u64,
        timestamp: SimTime,
    ) -> Self {
        Self {
            height,
            miner_id,
            nonce,
            parent_miner_id,
            size_bytes,
            timestamp,
            received_at: 0.0,
            origin: None,
            transactions: Vec::new(),
        }
    }

    /// The genesis block every ledger starts from.
    pub fn genesis() -> Self {
        Self::default()
    }

    pub fn id(&self) -> BlockId {
        BlockId::new(self.height, self.miner_id)
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// The block without its transaction payload, as carried by `HEADERS`.
    pub fn header(&self) -> Block {
        Block {
            transactions: Vec::new(),
            ..self.clone()
        }
    }

    /// Record where and when this copy arrived.
    pub fn received(mut self, from: PeerId, at: SimTime) -> Self {
        self.origin = Some(from);
        self.received_at = at;
        self
    }

    pub fn has_transaction(&self, id: TransactionId) -> bool {
        self.transactions.iter().any(|t| t.id() == id)
    }

    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transactions.push(transaction);
    }
}
