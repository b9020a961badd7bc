//! Orphan promotion.

use gl_02_ledger_store::{LedgerStore, OrphanPool};
use shared_types::Block;
use std::collections::VecDeque;

/// Move every orphan descending from `root` into the ledger, breadth-first.
///
/// `root` must already be stored. Returns the promoted blocks in the order
/// they were stored.
pub fn promote_orphans(ledger: &mut LedgerStore, orphans: &mut OrphanPool, root: &Block) -> Vec<Block> {
    let linkage = ledger.linkage();
    let mut promoted = Vec::new();
    let mut frontier = VecDeque::from([root.clone()]);

    while let Some(parent) = frontier.pop_front() {
        for child in orphans.take_children(&parent, linkage) {
            if ledger.add_block(child.clone()) {
                promoted.push(child.clone());
                frontier.push_back(child);
            }
        }
    }
    promoted
}
