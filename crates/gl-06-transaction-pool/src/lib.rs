//! # Transaction Pool (gl-06)
//!
//! Tracks the transactions one node has seen and applies its role's rules
//! to them.
//!
//! ## Lifecycle
//!
//! ```text
//! Client ──create──→ REQUEST_TRANS ──→ Committer/Order ──forward──→ ...
//!                                  └─→ Endorser ──execute──→ REPLY_TRANS
//!
//! Committer: block stored ──→ contained transactions marked validated
//! ```
//!
//! A transaction is never deleted; it only moves between the pending,
//! executed and reply collections.

pub mod domain;

pub use domain::*;
