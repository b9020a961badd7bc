//! Outbound ports (SPI) for the gossip subsystem.

use shared_types::{BlockId, PeerId};
use std::time::Duration;

use crate::events::MessageKind;

/// Timer identity. Setting a timer that is already armed replaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Request for this block went unanswered.
    InventoryTimeout(BlockId),
    /// Received block is ready to be stored.
    Validation(BlockId),
    /// A client mints its next transaction.
    NextTransaction,
}

/// Side effects requested by a node.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Deliver an encoded frame to a peer.
    Send {
        to: PeerId,
        kind: MessageKind,
        bytes: Vec<u8>,
        /// Size charged for transmission, per `WireSizes`.
        wire_bytes: u64,
    },
    SetTimer { id: TimerId, after: Duration },
    CancelTimer { id: TimerId },
}

/// Byte transport between nodes.
pub trait Transport {
    fn send(&mut self, from: PeerId, to: PeerId, bytes: Vec<u8>, wire_bytes: u64);
}

/// Scheduling for one node's timers.
pub trait TimerScheduler {
    fn set_timer(&mut self, node: PeerId, id: TimerId, after: Duration);
    fn cancel_timer(&mut self, node: PeerId, id: TimerId);
}
