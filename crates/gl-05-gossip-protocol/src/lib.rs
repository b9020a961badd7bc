//! # Gossip Protocol (gl-05)
//!
//! Inventory-based block and transaction gossip between simulated nodes.
//!
//! ## Architecture Role
//!
//! ```text
//! [Runtime] ──NodeEvent──→ [NodeSession] ──Vec<Action>──→ [Runtime]
//!                              │    │
//!                 gl-02 ledger ┘    └ gl-06 transaction pool
//! ```
//!
//! The session never touches a socket or a clock. The runtime feeds it
//! events (bytes, timer fires, mined blocks) and executes the sends and
//! timer changes it asks for.
//!
//! ## Wire Format
//!
//! Messages are JSON objects terminated by `#`. A stream may split or merge
//! frames arbitrarily; `FrameDecoder` reassembles them per peer and drops
//! frames that do not decode.
//!
//! ## Guarantees
//!
//! - At most one block request is outstanding per block and node
//! - A block already stored, orphaned or awaiting validation is never requested
//! - Unknown message discriminators are ignored without tearing down the node

pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use domain::*;
pub use events::{Envelope, FrameError, GossipError, MessageKind};
pub use ports::inbound::{GossipNode, NodeEvent};
pub use ports::outbound::{Action, TimerId, TimerScheduler, Transport};
pub use service::NodeSession;
