//! # Shared Types Crate
//!
//! This crate contains the entities every gossip-ledger subsystem agrees on:
//! blocks, transactions, their identifiers, node roles and the statistics
//! record a node fills in while it runs.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Wire-compatible**: `Block` and `Transaction` serialize to the JSON
//!   records carried inside gossip frames; local-only fields are skipped.

pub mod entities;
pub mod errors;
pub mod roles;
pub mod stats;

pub use entities::*;
pub use errors::*;
pub use roles::*;
pub use stats::*;
