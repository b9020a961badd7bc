//! # Orphan Pool
//!
//! Blocks that arrived before their parent. The gossip layer moves them into
//! the ledger once the parent lands; the pool itself never promotes.

use shared_types::{Block, BlockId};

use super::value_objects::LinkageRule;

#[derive(Debug, Clone, Default)]
pub struct OrphanPool {
    orphans: Vec<Block>,
}

impl OrphanPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool `block`. Returns `false` if an orphan with the same identity is
    /// already held.
    pub fn add(&mut self, block: Block) -> bool {
        if self.is_orphan(block.id()) {
            return false;
        }
        self.orphans.push(block);
        true
    }

    /// Remove and return the orphan with this identity, if held.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let pos = self.orphans.iter().position(|b| b.id() == id)?;
        Some(self.orphans.remove(pos))
    }

    pub fn is_orphan(&self, id: BlockId) -> bool {
        self.orphans.iter().any(|b| b.id() == id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.orphans.iter().find(|b| b.id() == id)
    }

    /// Orphans whose parent is `parent`.
    pub fn children_of(&self, parent: &Block, linkage: LinkageRule) -> Vec<&Block> {
        self.orphans
            .iter()
            .filter(|orphan| linkage.is_parent(parent, orphan))
            .collect()
    }

    /// Remove and return every orphan whose parent is `parent`, oldest first.
    pub fn take_children(&mut self, parent: &Block, linkage: LinkageRule) -> Vec<Block> {
        let (children, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.orphans)
            .into_iter()
            .partition(|orphan| linkage.is_parent(parent, orphan));
        self.orphans = rest;
        children
    }

    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.orphans.iter()
    }
}
