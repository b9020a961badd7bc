//! # Node Session
//!
//! The per-node gossip state machine.
//!
//! ## Architecture
//!
//! `NodeSession` implements the inbound [`GossipNode`] port. It owns the
//! node's ledger, orphan pool, staging area, inventory tracker, frame
//! decoder and transaction pool, and answers every [`NodeEvent`] with the
//! [`Action`]s the runner must execute. It performs no I/O itself.
//!
//! ## Block Flow
//!
//! ```text
//! INV ──→ GET_HEADERS + GET_DATA ──→ BLOCK ──→ staged ──(validation timer)──→ stored
//!                                                                     │
//!                                           parent missing → orphan ──┘ promoted later
//! ```
//!
//! Stored blocks are advertised to every peer except the one that delivered
//! them: by `INV` under the standard protocol, by `HEADERS` under
//! send-headers.
//!
//! ## Timers
//!
//! Timers are keyed by [`TimerId`]. Re-arming an armed timer cancels it first,
//! and a fire for a timer the session no longer considers armed is dropped.

use std::collections::HashSet;
use std::time::Duration;

use gl_02_ledger_store::{LedgerStore, OrphanPool};
use gl_06_transaction_pool::{RequestOutcome, RoleBehavior, TransactionPool};
use shared_types::{
    Block, BlockId, NodeStatistics, PeerId, ProtocolVariant, RunningMean, SimTime,
};
use tracing::{debug, info, warn};

use crate::domain::{
    promote_orphans, AnnounceOutcome, ExpiryOutcome, FrameDecoder, GossipConfig,
    InventoryTracker, NodeSetup, SessionConfig, StagingArea,
};
use crate::events::{Envelope, GossipError, MessageKind};
use crate::ports::inbound::{GossipNode, NodeEvent};
use crate::ports::outbound::{Action, TimerId};

/// Gossip state of one node.
pub struct NodeSession {
    setup: NodeSetup,
    config: GossipConfig,
    ledger: LedgerStore,
    orphans: OrphanPool,
    staging: StagingArea,
    inventory: InventoryTracker<BlockId>,
    frames: FrameDecoder,
    transactions: TransactionPool,
    stats: NodeStatistics,
    /// Interval between consecutive received blocks.
    block_receive: RunningMean,
    /// Mint-to-store delay of received blocks.
    block_propagation: RunningMean,
    block_size: RunningMean,
    previous_block_receive: SimTime,
    armed: HashSet<TimerId>,
    running: bool,
    now: SimTime,
}

impl NodeSession {
    pub fn new(setup: NodeSetup, config: SessionConfig) -> Self {
        let transactions = TransactionPool::new(setup.node_id, setup.role, config.transactions);
        let stats = NodeStatistics::new(setup.node_id, setup.role.code());
        Self {
            ledger: LedgerStore::new(config.ledger),
            orphans: OrphanPool::new(),
            staging: StagingArea::new(),
            inventory: InventoryTracker::new(),
            frames: FrameDecoder::new(),
            transactions,
            stats,
            block_receive: RunningMean::default(),
            block_propagation: RunningMean::default(),
            block_size: RunningMean::default(),
            previous_block_receive: 0.0,
            armed: HashSet::new(),
            running: false,
            now: 0.0,
            config: config.gossip,
            setup,
        }
    }

    pub fn id(&self) -> PeerId {
        PeerId(self.setup.node_id)
    }

    pub fn setup(&self) -> &NodeSetup {
        &self.setup
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn orphans(&self) -> &OrphanPool {
        &self.orphans
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn inventory(&self) -> &InventoryTracker<BlockId> {
        &self.inventory
    }

    pub fn transactions(&self) -> &TransactionPool {
        &self.transactions
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Timers currently armed, in no particular order.
    pub fn armed_timers(&self) -> impl Iterator<Item = &TimerId> {
        self.armed.iter()
    }

    /// Snapshot of the node's statistics with the running means folded in.
    pub fn statistics(&self) -> NodeStatistics {
        let mut stats = self.stats.clone();
        stats.mean_block_receive_time = self.block_receive.mean();
        stats.mean_block_propagation_time = self.block_propagation.mean();
        stats.mean_block_size = self.block_size.mean();
        stats.total_blocks = self.ledger.total_blocks() as u64;
        stats.blocks_in_forks = self.ledger.blocks_in_forks() as u64;
        stats.longest_fork = self.ledger.longest_fork() as u64;
        stats.node_generated_transaction = self.transactions.generated();
        stats.mean_endorsement_time = self.transactions.endorsement().mean();
        stats.mean_ordering_time = self.transactions.ordering().mean();
        stats.mean_validation_time = self.transactions.validation().mean();
        stats
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn on_start(&mut self, actions: &mut Vec<Action>) {
        if self.running {
            return;
        }
        self.running = true;
        self.stats = NodeStatistics::new(self.setup.node_id, self.setup.role.code());
        self.stats.connections = self.setup.peers.len();
        info!(
            node = self.setup.node_id,
            role = %self.setup.role,
            protocol = %self.setup.protocol,
            peers = self.setup.peers.len(),
            "[gl-05] Node started"
        );

        if self.setup.role.originates_transactions() {
            let interval = self.transactions.config().creating_interval;
            self.arm_timer(TimerId::NextTransaction, interval, actions);
        }
    }

    fn on_stop(&mut self, actions: &mut Vec<Action>) {
        if !self.running {
            return;
        }
        self.running = false;

        let mut armed: Vec<TimerId> = self.armed.drain().collect();
        armed.sort();
        actions.extend(armed.into_iter().map(|id| Action::CancelTimer { id }));
        let abandoned = self.inventory.clear();
        // Their validation timers were just cancelled.
        let unvalidated = self.staging.clear_received();
        self.frames.clear();

        self.stats = self.statistics();
        info!(
            node = self.setup.node_id,
            total_blocks = self.stats.total_blocks,
            blocks_in_forks = self.stats.blocks_in_forks,
            longest_fork = self.stats.longest_fork,
            block_timeouts = self.stats.block_timeouts,
            pending_requests = abandoned.len(),
            dropped_unvalidated = unvalidated,
            mean_propagation = self.stats.mean_block_propagation_time,
            "[gl-05] Node stopped"
        );
    }

    // =========================================================================
    // Inbound bytes
    // =========================================================================

    fn on_bytes(&mut self, from: PeerId, bytes: &[u8], actions: &mut Vec<Action>) {
        let envelopes: Vec<Envelope> = self.frames.feed(from, bytes).collect();
        for envelope in envelopes {
            self.dispatch(from, &envelope, actions);
        }
    }

    fn dispatch(&mut self, from: PeerId, envelope: &Envelope, actions: &mut Vec<Action>) {
        let Some(kind) = envelope.kind() else {
            debug!(
                node = self.setup.node_id,
                peer = %from,
                error = %GossipError::UnknownMessage(envelope.message),
                "[gl-05] Ignoring message"
            );
            return;
        };

        match kind {
            MessageKind::Inv => self.on_inv(from, envelope, actions),
            MessageKind::GetHeaders => self.on_get_headers(from, envelope, actions),
            MessageKind::Headers => self.on_headers(from, envelope, actions),
            MessageKind::GetData => self.on_get_data(from, envelope, actions),
            MessageKind::Block => self.on_block(from, envelope, actions),
            MessageKind::RequestTrans => self.on_request_trans(from, envelope, actions),
            MessageKind::ReplyTrans => self.on_reply_trans(from, envelope),
            MessageKind::NoMessage | MessageKind::MsgTrans | MessageKind::ResultTrans => {
                debug!(
                    node = self.setup.node_id,
                    peer = %from,
                    %kind,
                    "[gl-05] No handler for message"
                );
            }
        }
    }

    /// Parse inventory keys, dropping malformed ones.
    fn parse_keys(&self, from: PeerId, keys: &[String]) -> Vec<BlockId> {
        keys.iter()
            .filter_map(|key| match key.parse::<BlockId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(
                        node = self.setup.node_id,
                        peer = %from,
                        error = %GossipError::from(e),
                        "[gl-05] Dropping inventory key"
                    );
                    None
                }
            })
            .collect()
    }

    /// Stored, orphaned, or waiting for validation.
    fn is_known(&self, id: BlockId) -> bool {
        self.ledger.contains_id(id) || self.orphans.is_orphan(id) || self.staging.is_received(id)
    }

    // =========================================================================
    // Block gossip
    // =========================================================================

    fn on_inv(&mut self, from: PeerId, envelope: &Envelope, actions: &mut Vec<Action>) {
        if !self.setup.role.handles_inventory() {
            return;
        }
        let wire = self.config.wire;
        self.stats.inv.received += wire.message_bytes(MessageKind::Inv, envelope.inv.len(), 0);

        let mut requests = Vec::new();
        for id in self.parse_keys(from, &envelope.inv) {
            if self.is_known(id) {
                continue;
            }
            match self.inventory.announce(id, from) {
                AnnounceOutcome::Request => requests.push(id),
                AnnounceOutcome::AlreadyTracked => debug!(
                    node = self.setup.node_id,
                    peer = %from,
                    block = %id,
                    "[gl-05] Block already requested"
                ),
            }
        }
        self.request_blocks(from, &requests, true, actions);
    }

    /// Ask `peer` for `ids`, arming one timeout per block.
    fn request_blocks(
        &mut self,
        peer: PeerId,
        ids: &[BlockId],
        with_headers: bool,
        actions: &mut Vec<Action>,
    ) {
        if ids.is_empty() {
            return;
        }
        for &id in ids {
            self.inventory.mark_requested(&id, peer);
            self.arm_timer(TimerId::InventoryTimeout(id), self.config.inv_timeout, actions);
        }

        let wire = self.config.wire;
        if with_headers {
            let bytes = wire.message_bytes(MessageKind::GetHeaders, ids.len(), 0);
            self.stats.get_headers.sent += bytes;
            self.send(peer, Envelope::get_headers(ids), bytes, actions);
        }
        let bytes = wire.message_bytes(MessageKind::GetData, ids.len(), 0);
        self.stats.get_data.sent += bytes;
        self.send(peer, Envelope::get_data(ids), bytes, actions);
    }

    fn on_get_headers(&mut self, from: PeerId, envelope: &Envelope, actions: &mut Vec<Action>) {
        let wire = self.config.wire;
        let keys = envelope.block_keys();
        self.stats.get_headers.received +=
            wire.message_bytes(MessageKind::GetHeaders, keys.len(), 0);

        let headers: Vec<Block> = self
            .parse_keys(from, keys)
            .into_iter()
            .filter_map(|id| self.ledger.get(id))
            .map(Block::header)
            .collect();
        if headers.is_empty() {
            return;
        }
        let bytes = wire.message_bytes(MessageKind::Headers, headers.len(), 0);
        self.stats.headers.sent += bytes;
        self.send(from, Envelope::headers(headers), bytes, actions);
    }

    fn on_get_data(&mut self, from: PeerId, envelope: &Envelope, actions: &mut Vec<Action>) {
        let wire = self.config.wire;
        let keys = envelope.block_keys();
        self.stats.get_data.received += wire.message_bytes(MessageKind::GetData, keys.len(), 0);

        let blocks: Vec<Block> = self
            .parse_keys(from, keys)
            .into_iter()
            .filter_map(|id| self.ledger.get(id).cloned())
            .collect();
        if blocks.is_empty() {
            return;
        }
        let payload: u64 = blocks.iter().map(|b| b.size_bytes).sum();
        let bytes = wire.message_bytes(MessageKind::Block, blocks.len(), payload);
        self.stats.block.sent += bytes;
        self.send(from, Envelope::block(blocks), bytes, actions);
    }

    fn on_headers(&mut self, from: PeerId, envelope: &Envelope, actions: &mut Vec<Action>) {
        if !self.setup.role.handles_inventory() {
            return;
        }
        let records = envelope.block_records();
        self.stats.headers.received +=
            self.config
                .wire
                .message_bytes(MessageKind::Headers, records.len(), 0);

        let mut requests = Vec::new();
        for header in records {
            let id = header.id();
            if self.is_known(id) {
                continue;
            }
            self.staging.record_header(header.header());
            if self.setup.protocol == ProtocolVariant::SendHeaders
                && self.inventory.announce(id, from) == AnnounceOutcome::Request
            {
                requests.push(id);
            }
        }
        self.request_blocks(from, &requests, false, actions);
    }

    fn on_block(&mut self, from: PeerId, envelope: &Envelope, actions: &mut Vec<Action>) {
        if !self.setup.role.handles_inventory() {
            return;
        }
        let records = envelope.block_records();
        let payload: u64 = records.iter().map(|b| b.size_bytes).sum();
        self.stats.block.received +=
            self.config
                .wire
                .message_bytes(MessageKind::Block, records.len(), payload);

        for record in records {
            let id = record.id();
            if self.is_known(id) {
                debug!(
                    node = self.setup.node_id,
                    peer = %from,
                    block = %id,
                    "[gl-05] Duplicate block delivery"
                );
                continue;
            }
            if self.inventory.resolve(&id).is_some() {
                self.cancel_timer(TimerId::InventoryTimeout(id), actions);
            }
            self.staging
                .stage_block(record.clone().received(from, self.now));
            self.arm_timer(
                TimerId::Validation(id),
                self.config.validation_delay,
                actions,
            );
        }
    }

    fn on_block_minted(&mut self, mut block: Block, actions: &mut Vec<Action>) {
        block.origin = None;
        block.received_at = self.now;
        debug!(
            node = self.setup.node_id,
            block = %block.id(),
            "[gl-05] Block minted"
        );
        self.accept_block(block, actions);
    }

    /// Store `block` if its parent is present, otherwise park it as an orphan.
    fn accept_block(&mut self, block: Block, actions: &mut Vec<Action>) {
        let id = block.id();
        if self.ledger.contains_id(id) || self.orphans.is_orphan(id) {
            return;
        }
        if !self.ledger.has_parent_of(&block) {
            debug!(
                node = self.setup.node_id,
                block = %id,
                "[gl-05] Parent missing, block kept as orphan"
            );
            self.orphans.add(block);
            return;
        }

        if !self.ledger.add_block(block.clone()) {
            return;
        }
        let promoted = promote_orphans(&mut self.ledger, &mut self.orphans, &block);
        if !promoted.is_empty() {
            debug!(
                node = self.setup.node_id,
                parent = %id,
                promoted = promoted.len(),
                "[gl-05] Orphans promoted"
            );
        }

        let mut stored = Vec::with_capacity(promoted.len() + 1);
        stored.push(block);
        stored.extend(promoted);
        for block in &stored {
            self.record_stored(block);
        }
        for block in &stored {
            self.advertise(block, actions);
        }
    }

    fn record_stored(&mut self, block: &Block) {
        self.transactions.validate_from_block(block, self.now);
        if block.origin.is_none() {
            return;
        }
        self.block_receive
            .fold(self.now - self.previous_block_receive);
        self.previous_block_receive = self.now;
        self.block_propagation.fold(self.now - block.timestamp);
        self.block_size.fold(block.size_bytes as f64);
    }

    /// Announce a stored block to every peer except the one it came from.
    fn advertise(&mut self, block: &Block, actions: &mut Vec<Action>) {
        let targets: Vec<PeerId> = self
            .setup
            .peers
            .iter()
            .copied()
            .filter(|peer| Some(*peer) != block.origin)
            .collect();
        let wire = self.config.wire;

        match self.setup.protocol {
            ProtocolVariant::Standard => {
                let bytes = wire.message_bytes(MessageKind::Inv, 1, 0);
                for peer in targets {
                    self.stats.inv.sent += bytes;
                    self.send(peer, Envelope::inv([block.id()]), bytes, actions);
                }
            }
            ProtocolVariant::SendHeaders => {
                let bytes = wire.message_bytes(MessageKind::Headers, 1, 0);
                for peer in targets {
                    self.stats.headers.sent += bytes;
                    self.send(peer, Envelope::headers(vec![block.header()]), bytes, actions);
                }
            }
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    fn on_timer(&mut self, id: TimerId, actions: &mut Vec<Action>) {
        if !self.armed.remove(&id) {
            debug!(node = self.setup.node_id, timer = ?id, "[gl-05] Stale timer");
            return;
        }
        match id {
            TimerId::InventoryTimeout(block) => self.on_inventory_timeout(block, actions),
            TimerId::Validation(block) => {
                if let Some(block) = self.staging.take_received(block) {
                    self.accept_block(block, actions);
                }
            }
            TimerId::NextTransaction => self.on_next_transaction(actions),
        }
    }

    fn on_inventory_timeout(&mut self, id: BlockId, actions: &mut Vec<Action>) {
        if self.is_known(id) {
            self.inventory.resolve(&id);
            return;
        }
        match self
            .inventory
            .expire(&id, self.config.max_request_attempts)
        {
            ExpiryOutcome::Stale => {}
            ExpiryOutcome::Retry { peer } => {
                self.stats.block_timeouts += 1;
                debug!(
                    node = self.setup.node_id,
                    block = %id,
                    %peer,
                    "[gl-05] Request timed out, retrying"
                );
                self.request_blocks(peer, &[id], true, actions);
            }
            ExpiryOutcome::Abandoned => {
                self.stats.block_timeouts += 1;
                warn!(
                    node = self.setup.node_id,
                    block = %id,
                    "[gl-05] Request timed out, no announcer left"
                );
            }
        }
    }

    fn arm_timer(&mut self, id: TimerId, after: Duration, actions: &mut Vec<Action>) {
        if !self.armed.insert(id) {
            actions.push(Action::CancelTimer { id });
        }
        actions.push(Action::SetTimer { id, after });
    }

    fn cancel_timer(&mut self, id: TimerId, actions: &mut Vec<Action>) {
        if self.armed.remove(&id) {
            actions.push(Action::CancelTimer { id });
        }
    }

    // =========================================================================
    // Transaction gossip
    // =========================================================================

    fn on_next_transaction(&mut self, actions: &mut Vec<Action>) {
        if !self.setup.role.originates_transactions() {
            return;
        }
        let transaction = self.transactions.create_transaction(self.now);
        self.stats.node_generated_transaction = self.transactions.generated();
        debug!(
            node = self.setup.node_id,
            tx = %transaction.id(),
            "[gl-05] Transaction created"
        );

        let bytes = self.config.wire.message_bytes(MessageKind::RequestTrans, 1, 0);
        for peer in self.setup.peers.clone() {
            self.stats.get_data.sent += bytes;
            self.send(
                peer,
                Envelope::request_trans(vec![transaction.clone()]),
                bytes,
                actions,
            );
        }

        let interval = self.transactions.config().creating_interval;
        self.arm_timer(TimerId::NextTransaction, interval, actions);
    }

    fn on_request_trans(&mut self, from: PeerId, envelope: &Envelope, actions: &mut Vec<Action>) {
        if !self.setup.role.accepts_transaction_requests() {
            return;
        }
        let wire = self.config.wire;
        self.stats.get_data.received +=
            wire.message_bytes(MessageKind::RequestTrans, envelope.transactions.len(), 0);

        let mut replies = Vec::new();
        let mut forwards = Vec::new();
        for transaction in &envelope.transactions {
            match self.transactions.admit_request(transaction, self.now) {
                RequestOutcome::Executed(executed) => replies.push(executed),
                RequestOutcome::Forward(fresh) => forwards.push(fresh),
                RequestOutcome::AlreadyHeld | RequestOutcome::Ignored => {}
            }
        }

        if !replies.is_empty() {
            let bytes = wire.message_bytes(MessageKind::ReplyTrans, replies.len(), 0);
            self.stats.get_data.sent += bytes;
            self.send(from, Envelope::reply_trans(replies), bytes, actions);
        }
        if !forwards.is_empty() {
            let bytes = wire.message_bytes(MessageKind::RequestTrans, forwards.len(), 0);
            let targets: Vec<PeerId> = self
                .setup
                .peers
                .iter()
                .copied()
                .filter(|peer| *peer != from)
                .collect();
            for peer in targets {
                self.stats.get_data.sent += bytes;
                self.send(peer, Envelope::request_trans(forwards.clone()), bytes, actions);
            }
        }
    }

    fn on_reply_trans(&mut self, from: PeerId, envelope: &Envelope) {
        self.stats.get_data.received += self.config.wire.message_bytes(
            MessageKind::ReplyTrans,
            envelope.transactions.len(),
            0,
        );
        for transaction in &envelope.transactions {
            let disposition = self.transactions.admit_reply(transaction);
            debug!(
                node = self.setup.node_id,
                peer = %from,
                tx = %transaction.id(),
                execution = transaction.execution,
                ?disposition,
                "[gl-05] Execution reply"
            );
        }
    }

    // =========================================================================
    // Output
    // =========================================================================

    fn send(&self, to: PeerId, envelope: Envelope, wire_bytes: u64, actions: &mut Vec<Action>) {
        let Some(kind) = envelope.kind() else {
            return;
        };
        match envelope.encode_frame() {
            Ok(bytes) => actions.push(Action::Send {
                to,
                kind,
                bytes,
                wire_bytes,
            }),
            Err(e) => warn!(
                node = self.setup.node_id,
                peer = %to,
                %kind,
                error = %e,
                "[gl-05] Failed to encode message"
            ),
        }
    }
}

impl GossipNode for NodeSession {
    fn handle(&mut self, event: NodeEvent) -> Vec<Action> {
        let mut actions = Vec::new();
        match event {
            NodeEvent::Start => self.on_start(&mut actions),
            NodeEvent::Stop => self.on_stop(&mut actions),
            _ if !self.running => {
                debug!(node = self.setup.node_id, "[gl-05] Event ignored while stopped");
            }
            NodeEvent::BytesReceived { from, bytes } => self.on_bytes(from, &bytes, &mut actions),
            NodeEvent::TimerFired(id) => self.on_timer(id, &mut actions),
            NodeEvent::BlockMinted(block) => self.on_block_minted(block, &mut actions),
        }
        actions
    }

    fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    fn now(&self) -> SimTime {
        self.now
    }
}
