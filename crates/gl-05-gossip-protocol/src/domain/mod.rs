//! # Domain Layer for Gossip
//!
//! Pure protocol state with no I/O. The session in `service.rs` drives these
//! pieces and turns their decisions into actions.
//!
//! ## Contents
//!
//! - **frame**: `FrameDecoder`, per-peer stream reassembly
//! - **inventory**: `InventoryTracker`, request deduplication and retry
//! - **staging**: blocks received or announced but not stored yet
//! - **promotion**: breadth-first orphan promotion
//! - **value_objects**: `GossipConfig`, `WireSizes`, `NodeSetup`

mod frame;
mod inventory;
mod promotion;
mod staging;
mod value_objects;

pub use frame::*;
pub use inventory::*;
pub use promotion::*;
pub use staging::*;
pub use value_objects::*;
