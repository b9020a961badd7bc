//! Value objects for ledger configuration and block linkage.

use serde::{Deserialize, Serialize};
use shared_types::Block;

/// How the ledger decides that one block is the parent of another.
///
/// Both rules require the heights to be adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkageRule {
    /// The child names the parent's miner: `child.parent_miner_id == parent.miner_id`.
    #[default]
    MinerIdentity,
    /// Both blocks carry the same `parent_miner_id`.
    ///
    /// This is the relation older simulator builds used. It really matches
    /// siblings' parents rather than parent and child, so chains only link
    /// while every block descends from miner 0. Kept for reproducing old runs.
    SharedParent,
}

impl LinkageRule {
    /// Is `parent` the direct parent of `child`?
    pub fn is_parent(self, parent: &Block, child: &Block) -> bool {
        if parent.height + 1 != child.height {
            return false;
        }
        match self {
            Self::MinerIdentity => child.parent_miner_id == parent.miner_id,
            Self::SharedParent => child.parent_miner_id == parent.parent_miner_id,
        }
    }

    /// Is `child` a direct child of `parent`?
    pub fn is_child(self, child: &Block, parent: &Block) -> bool {
        self.is_parent(parent, child)
    }
}

/// Ledger configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub linkage: LinkageRule,
}

impl LedgerConfig {
    pub fn with_linkage(linkage: LinkageRule) -> Self {
        Self { linkage }
    }
}
