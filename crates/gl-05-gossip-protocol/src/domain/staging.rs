//! Blocks the node has heard of but not stored yet.
//!
//! - received, not validated: full blocks waiting out the validation delay
//! - only headers: headers seen without their block body

use shared_types::{Block, BlockId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StagingArea {
    received_not_validated: HashMap<BlockId, Block>,
    only_headers: HashMap<BlockId, Block>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold a full block until its validation timer fires. A later copy of
    /// the same block replaces nothing.
    pub fn stage_block(&mut self, block: Block) -> bool {
        let id = block.id();
        if self.received_not_validated.contains_key(&id) {
            return false;
        }
        self.only_headers.remove(&id);
        self.received_not_validated.insert(id, block);
        true
    }

    pub fn take_received(&mut self, id: BlockId) -> Option<Block> {
        self.received_not_validated.remove(&id)
    }

    /// Drop every block still waiting for validation. Returns how many.
    pub fn clear_received(&mut self) -> usize {
        let dropped = self.received_not_validated.len();
        self.received_not_validated.clear();
        dropped
    }

    pub fn is_received(&self, id: BlockId) -> bool {
        self.received_not_validated.contains_key(&id)
    }

    /// Remember a header whose block has not arrived.
    pub fn record_header(&mut self, header: Block) -> bool {
        let id = header.id();
        if self.only_headers.contains_key(&id) || self.is_received(id) {
            return false;
        }
        self.only_headers.insert(id, header);
        true
    }

    pub fn has_header(&self, id: BlockId) -> bool {
        self.only_headers.contains_key(&id)
    }

    pub fn received_count(&self) -> usize {
        self.received_not_validated.len()
    }

    pub fn header_count(&self) -> usize {
        self.only_headers.len()
    }
}
