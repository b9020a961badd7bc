//! Ports for the gossip subsystem.
//!
//! - `inbound`: events a node consumes and the `GossipNode` trait
//! - `outbound`: actions a node emits and the runtime capabilities that
//!   carry them out

pub mod inbound;
pub mod outbound;
