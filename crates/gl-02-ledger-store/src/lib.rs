//! # Ledger Store (gl-02)
//!
//! Each node's local view of the chain: every accepted block, grouped by
//! height so competing forks are kept side by side, plus the orphan pool of
//! blocks whose parent has not arrived yet.
//!
//! ## Domain Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Genesis | Height 0 holds exactly the genesis block from construction on |
//! | Unique identity | No group holds two blocks with the same miner |
//! | Fail closed | Lookups above the current top report "absent" |
//! | Never pruned | Stored blocks are never removed, forks included |
//! | Orphan parentage | An orphan's parent was absent from the ledger when it was pooled |
//!
//! Lookups never fail: a missing block comes back as `None` or as the empty
//! default block, never as an error.
//!
//! ## Crate Structure
//!
//! - `domain/ledger` - `LedgerStore`, the height-indexed block arena
//! - `domain/orphans` - `OrphanPool`
//! - `domain/value_objects` - `LinkageRule`, `LedgerConfig`

pub mod domain;

pub use domain::*;
