//! Value objects for the transaction pool.

use serde::{Deserialize, Serialize};
use shared_types::{Transaction, TRANSACTION_SIZE_BYTES};
use std::time::Duration;

/// Transaction pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Size accounted for each transaction.
    pub transaction_size_bytes: u64,
    /// Interval between transactions minted by a client.
    pub creating_interval: Duration,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            transaction_size_bytes: TRANSACTION_SIZE_BYTES,
            creating_interval: Duration::from_secs(1),
        }
    }
}

impl TransactionConfig {
    /// Fast minting for short tests.
    pub fn for_testing() -> Self {
        Self {
            creating_interval: Duration::from_millis(100),
            ..Self::default()
        }
    }
}

/// Result of admitting one transaction from a `REQUEST_TRANS`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// This role does not process requests.
    Ignored,
    /// Already held; nothing to do.
    AlreadyHeld,
    /// Executed locally; reply to the requester with this transaction.
    Executed(Transaction),
    /// Stored; advertise it onward.
    Forward(Transaction),
}

/// Result of admitting one transaction from a `REPLY_TRANS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// The same `(nodeId, transId, execution)` reply was already recorded.
    Duplicate,
    /// Recorded as a new reply.
    Record,
    /// The reply concerns a transaction this node created. Not recorded.
    OwnOrigin,
}
