//! # Gossip-Ledger Test Suite
//!
//! Multi-node scenarios that run real `NodeSession`s over the simulated
//! network and check what the whole network ends up with.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── block_propagation.rs   # INV / HEADERS gossip, orphans, dedup
//!     └── transaction_flow.rs    # client → endorser → committer lifecycle
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gl-tests
//! cargo test -p gl-tests integration::block_propagation::
//! ```

#![allow(dead_code)]

pub mod integration;
