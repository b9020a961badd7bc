//! # Ledger Store
//!
//! Height-indexed, fork-tolerant block repository.
//!
//! Blocks live in an arena (`blocks`) owned by the store; `heights[h]` lists
//! the arena slots of every block at height `h` in insertion order. Heights
//! may be skipped by out-of-order arrivals, in which case the intermediate
//! groups exist but are empty. The last group is never empty.

use shared_types::{Block, BlockId, NodeId};
use tracing::debug;

use super::value_objects::{LedgerConfig, LinkageRule};

/// All blocks a node has accepted.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    blocks: Vec<Block>,
    heights: Vec<Vec<usize>>,
    linkage: LinkageRule,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl LedgerStore {
    /// Create a ledger holding only the genesis block.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            heights: vec![vec![0]],
            linkage: config.linkage,
        }
    }

    pub fn linkage(&self) -> LinkageRule {
        self.linkage
    }

    /// Number of stored blocks, genesis included.
    pub fn total_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Height of the current top block.
    pub fn height(&self) -> u64 {
        (self.heights.len() - 1) as u64
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Is a block with this identity stored?
    ///
    /// Fails closed above the current top.
    pub fn has_block(&self, height: u64, miner_id: NodeId) -> bool {
        self.slot(height, miner_id).is_some()
    }

    pub fn contains(&self, block: &Block) -> bool {
        self.has_block(block.height, block.miner_id)
    }

    pub fn contains_id(&self, id: BlockId) -> bool {
        self.has_block(id.height, id.miner_id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.slot(id.height, id.miner_id).map(|slot| &self.blocks[slot])
    }

    /// Copy of the stored block, or the empty default block if absent.
    pub fn return_block(&self, height: u64, miner_id: NodeId) -> Block {
        self.get(BlockId::new(height, miner_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Blocks stored at `height`, in insertion order.
    pub fn blocks_at(&self, height: u64) -> impl Iterator<Item = &Block> + '_ {
        self.group(height)
            .iter()
            .map(move |&slot| &self.blocks[slot])
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// The stored parent of `block`. Genesis has none.
    pub fn parent_of(&self, block: &Block) -> Option<&Block> {
        let parent_height = block.height.checked_sub(1)?;
        self.blocks_at(parent_height)
            .find(|candidate| self.linkage.is_child(block, candidate))
    }

    /// Stored blocks that `block` is the parent of.
    pub fn children_of(&self, block: &Block) -> Vec<&Block> {
        self.blocks_at(block.height + 1)
            .filter(|candidate| self.linkage.is_parent(block, candidate))
            .collect()
    }

    /// Does the ledger hold the block `block` would extend?
    pub fn has_parent_of(&self, block: &Block) -> bool {
        self.parent_of(block).is_some()
    }

    /// First block inserted at the maximum height.
    pub fn current_top(&self) -> &Block {
        self.heights
            .last()
            .and_then(|group| group.first())
            .map(|&slot| &self.blocks[slot])
            .unwrap_or(&self.blocks[0])
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Store `block`, opening empty groups for any heights it skips.
    ///
    /// Returns `false` and stores nothing if a block with the same identity
    /// is already present.
    pub fn add_block(&mut self, block: Block) -> bool {
        if self.contains(&block) {
            return false;
        }

        let height = block.height as usize;
        if height >= self.heights.len() {
            let skipped = height - self.heights.len();
            if skipped > 0 {
                debug!(
                    height = block.height,
                    top = self.height(),
                    skipped,
                    "[gl-02] Block ahead of top, padding empty heights"
                );
            }
            self.heights.resize_with(height + 1, Vec::new);
        }

        let slot = self.blocks.len();
        self.blocks.push(block);
        self.heights[height].push(slot);
        true
    }

    // =========================================================================
    // Fork statistics
    // =========================================================================

    /// Blocks beyond the first at every height that has competitors.
    pub fn blocks_in_forks(&self) -> usize {
        self.heights
            .iter()
            .filter(|group| group.len() > 1)
            .map(|group| group.len() - 1)
            .sum()
    }

    /// Longest run of consecutive heights holding more than one block.
    pub fn longest_fork(&self) -> usize {
        let mut longest = 0;
        let mut current = 0;
        for group in &self.heights {
            if group.len() > 1 {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }

    fn group(&self, height: u64) -> &[usize] {
        usize::try_from(height)
            .ok()
            .and_then(|h| self.heights.get(h))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn slot(&self, height: u64, miner_id: NodeId) -> Option<usize> {
        self.group(height)
            .iter()
            .copied()
            .find(|&slot| self.blocks[slot].miner_id == miner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(height: u64, miner: NodeId, parent_miner: NodeId) -> Block {
        Block::new(height, miner, 0, parent_miner, 250, height as f64)
    }

    #[test]
    fn test_new_ledger_holds_only_genesis() {
        let ledger = LedgerStore::default();
        assert_eq!(ledger.total_blocks(), 1);
        assert_eq!(ledger.height(), 0);
        assert!(ledger.has_block(0, 0));
        assert_eq!(ledger.blocks_at(0).count(), 1);
        assert!(ledger.current_top().is_genesis());
    }

    #[test]
    fn test_genesis_has_no_parent() {
        let ledger = LedgerStore::default();
        assert!(ledger.parent_of(&Block::genesis()).is_none());
    }

    #[test]
    fn test_add_block_extends_top() {
        let mut ledger = LedgerStore::default();
        assert!(ledger.add_block(block(1, 3, 0)));
        assert_eq!(ledger.height(), 1);
        assert_eq!(ledger.total_blocks(), 2);
        assert_eq!(ledger.current_top().id(), BlockId::new(1, 3));
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut ledger = LedgerStore::default();
        assert!(ledger.add_block(block(1, 3, 0)));
        assert!(!ledger.add_block(block(1, 3, 0)));
        assert_eq!(ledger.blocks_at(1).count(), 1);
        assert_eq!(ledger.total_blocks(), 2);
    }

    #[test]
    fn test_height_gap_pads_empty_groups() {
        let mut ledger = LedgerStore::default();
        ledger.add_block(block(4, 2, 1));
        assert_eq!(ledger.height(), 4);
        for h in 1..4 {
            assert_eq!(ledger.blocks_at(h).count(), 0);
        }
        assert_eq!(ledger.current_top().id(), BlockId::new(4, 2));

        // The gap can be filled later.
        ledger.add_block(block(2, 1, 0));
        assert!(ledger.has_block(2, 1));
        assert_eq!(ledger.height(), 4);
    }

    #[test]
    fn test_has_block_fails_closed_above_top() {
        let ledger = LedgerStore::default();
        assert!(!ledger.has_block(10, 0));
        assert!(!ledger.has_block(u64::MAX, 0));
    }

    #[test]
    fn test_return_block_defaults_when_absent() {
        let mut ledger = LedgerStore::default();
        ledger.add_block(block(1, 3, 0));
        assert_eq!(ledger.return_block(1, 3).miner_id, 3);
        assert_eq!(ledger.return_block(1, 4), Block::default());
        assert_eq!(ledger.return_block(99, 1), Block::default());
    }

    #[test]
    fn test_top_is_first_inserted_at_max_height() {
        let mut ledger = LedgerStore::default();
        ledger.add_block(block(1, 5, 0));
        ledger.add_block(block(1, 2, 0));
        assert_eq!(ledger.current_top().miner_id, 5);
    }

    #[test]
    fn test_parent_and_children_navigation() {
        let mut ledger = LedgerStore::default();
        ledger.add_block(block(1, 1, 0));
        ledger.add_block(block(2, 2, 1));
        ledger.add_block(block(2, 3, 1));
        ledger.add_block(block(2, 4, 9));

        let parent = ledger.return_block(1, 1);
        let children: Vec<_> = ledger.children_of(&parent).iter().map(|b| b.id()).collect();
        assert_eq!(children, vec![BlockId::new(2, 2), BlockId::new(2, 3)]);

        let child = ledger.return_block(2, 3);
        assert_eq!(ledger.parent_of(&child).map(Block::id), Some(BlockId::new(1, 1)));
        assert!(!ledger.has_parent_of(&block(2, 4, 9)));
    }

    #[test]
    fn test_shared_parent_linkage_is_honoured() {
        let mut ledger = LedgerStore::new(LedgerConfig::with_linkage(LinkageRule::SharedParent));
        ledger.add_block(block(1, 1, 0));
        assert!(ledger.has_parent_of(&block(2, 2, 0)));
        assert!(!ledger.has_parent_of(&block(2, 2, 1)));
    }

    #[test]
    fn test_fork_statistics() {
        let mut ledger = LedgerStore::default();
        ledger.add_block(block(1, 1, 0));
        ledger.add_block(block(1, 2, 0));
        ledger.add_block(block(2, 1, 1));
        ledger.add_block(block(2, 2, 2));
        ledger.add_block(block(2, 3, 2));
        ledger.add_block(block(3, 1, 1));
        ledger.add_block(block(4, 1, 1));
        ledger.add_block(block(4, 2, 1));

        assert_eq!(ledger.blocks_in_forks(), 1 + 2 + 1);
        assert_eq!(ledger.longest_fork(), 2);
    }
}
