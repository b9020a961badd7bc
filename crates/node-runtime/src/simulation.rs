//! # Simulation Runner
//!
//! Wires one `NodeSession` per simulated node to the event queue and the
//! simulated network, and drives them with a single-threaded event loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  EventQueue (time, node, sequence)           │
//! └───────────────────┬──────────────────────────┘
//!                     ▼
//!   NodeSession::handle(event) ──→ Vec<Action>
//!                     │
//!        Send ────────┼──────── SetTimer / CancelTimer
//!          ▼                            ▼
//!   SimulatedNetwork ──chunks──→ EventQueue timers
//! ```
//!
//! Given the same configuration and seed, a run is fully deterministic.

use std::collections::{BTreeMap, BTreeSet};

use gl_02_ledger_store::LinkageRule;
use gl_05_gossip_protocol::{
    Action, GossipNode, NodeEvent, NodeSession, NodeSetup, TimerScheduler, Transport,
};
use gl_06_transaction_pool::RoleBehavior;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shared_types::{Block, BlockId, NodeRole, NodeStatistics, PeerId, SimTime};
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigError, SimulationConfig};
use crate::network::{SimulatedNetwork, TrafficStats};
use crate::scheduler::{EventKey, EventQueue, ScheduledEvent};

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStats {
    pub events_processed: u64,
    pub actions_generated: u64,
    pub blocks_minted: u64,
    pub timers_set: u64,
    pub timers_cancelled: u64,
}

/// Final statistics of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub simulated_seconds: f64,
    pub stats: SimulationStats,
    pub traffic: TrafficStats,
    pub nodes: Vec<NodeStatistics>,
}

impl SimulationReport {
    /// Mean block propagation time over nodes that received blocks.
    pub fn mean_propagation_time(&self) -> f64 {
        let samples: Vec<f64> = self
            .nodes
            .iter()
            .map(|n| n.mean_block_propagation_time)
            .filter(|t| *t > 0.0)
            .collect();
        if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        }
    }

    pub fn total_block_timeouts(&self) -> u64 {
        self.nodes.iter().map(|n| n.block_timeouts).sum()
    }
}

/// Deterministic multi-node simulation.
pub struct Simulation {
    config: SimulationConfig,
    sessions: BTreeMap<PeerId, NodeSession>,
    miners: Vec<PeerId>,
    queue: EventQueue,
    network: SimulatedNetwork,
    rng: StdRng,
    next_mine: Option<EventKey>,
    stats: SimulationStats,
}

impl Simulation {
    /// Build a random topology and role assignment from `config`.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let topology = build_topology(config.nodes, config.connections, &mut rng);

        let mut ids: Vec<PeerId> = topology.keys().copied().collect();
        ids.shuffle(&mut rng);
        let mut roles = BTreeMap::new();
        let mix = [
            (NodeRole::Order, config.orderers),
            (NodeRole::Endorser, config.endorsers),
            (NodeRole::Client, config.clients),
        ];
        let mut assigned = ids.iter();
        for (role, count) in mix {
            for id in assigned.by_ref().take(count as usize) {
                roles.insert(*id, role);
            }
        }
        for id in assigned {
            roles.insert(*id, NodeRole::Committer);
        }

        let setups = topology
            .into_iter()
            .map(|(id, peers)| {
                let role = roles.get(&id).copied().unwrap_or_default();
                NodeSetup::new(id.0, role)
                    .with_peers(peers)
                    .with_protocol(config.protocol)
                    .with_internet_speed(config.internet_speed)
            })
            .collect();
        Self::from_setups(config, setups, rng)
    }

    /// Build from explicit node setups. Miners are the first committers by id.
    pub fn with_setups(config: SimulationConfig, setups: Vec<NodeSetup>) -> Result<Self, ConfigError> {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::from_setups(config, setups, rng)
    }

    fn from_setups(
        config: SimulationConfig,
        setups: Vec<NodeSetup>,
        rng: StdRng,
    ) -> Result<Self, ConfigError> {
        if setups.len() < 2 {
            return Err(ConfigError::TooFewNodes(setups.len() as u32));
        }
        let mut session_config = config.session.clone();
        session_config.ledger.linkage = config.linkage;

        let mut network = SimulatedNetwork::new(config.network.clone(), config.seed);
        for setup in &setups {
            network.set_speed(PeerId(setup.node_id), setup.internet_speed);
        }

        let mut sessions = BTreeMap::new();
        for mut setup in setups {
            setup.peer_speeds = setup
                .peers
                .iter()
                .map(|peer| (*peer, network.speed(*peer)))
                .collect();
            sessions.insert(
                PeerId(setup.node_id),
                NodeSession::new(setup, session_config.clone()),
            );
        }

        let committers: Vec<PeerId> = sessions
            .iter()
            .filter(|(_, s)| s.setup().role == NodeRole::Committer)
            .map(|(id, _)| *id)
            .collect();
        let miners: Vec<PeerId> = committers
            .iter()
            .copied()
            .take(config.miners as usize)
            .collect();
        if miners.is_empty() {
            return Err(ConfigError::TooManyMiners {
                miners: config.miners,
                committers: committers.len() as u32,
            });
        }

        info!(
            nodes = sessions.len(),
            miners = miners.len(),
            protocol = %config.protocol,
            seed = config.seed,
            "Simulation built"
        );

        Ok(Self {
            config,
            sessions,
            miners,
            queue: EventQueue::new(),
            network,
            rng,
            next_mine: None,
            stats: SimulationStats::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    pub fn session(&self, id: PeerId) -> Option<&NodeSession> {
        self.sessions.get(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &NodeSession> {
        self.sessions.values()
    }

    pub fn miners(&self) -> &[PeerId] {
        &self.miners
    }

    pub fn stats(&self) -> SimulationStats {
        SimulationStats {
            timers_set: self.queue.timers_set(),
            timers_cancelled: self.queue.timers_cancelled(),
            ..self.stats
        }
    }

    pub fn traffic(&self) -> TrafficStats {
        self.network.stats()
    }

    // =========================================================================
    // Driving
    // =========================================================================

    /// Start every node now and begin mining.
    pub fn start(&mut self) {
        let now = self.now();
        let ids: Vec<PeerId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.queue
                .schedule(id, now, ScheduledEvent::Node(NodeEvent::Start));
        }
        self.schedule_next_mine();
    }

    /// Queue an event for a node at an absolute time.
    pub fn inject(&mut self, node: PeerId, at: SimTime, event: NodeEvent) {
        self.queue.schedule(node, at, ScheduledEvent::Node(event));
    }

    /// Have `miner` mine one block at `at`, outside the automatic schedule.
    pub fn mine_at(&mut self, miner: PeerId, at: SimTime) {
        self.queue.schedule(miner, at, ScheduledEvent::Mine);
    }

    /// Process events until the queue is empty or the next one is due after
    /// `end`. The clock ends at `end` either way.
    pub fn run_until(&mut self, end: SimTime) {
        while let Some((key, event)) = self.queue.pop_until(end) {
            self.stats.events_processed += 1;
            trace!(time = key.time, node = %key.node, "Processing event");
            match event {
                ScheduledEvent::Node(event) => self.dispatch(key.node, event),
                ScheduledEvent::Mine => {
                    let scheduled = self.next_mine == Some(key);
                    self.mine(key.node);
                    if scheduled {
                        self.schedule_next_mine();
                    }
                }
            }
        }
        self.queue.advance_to(end);
    }

    /// Stop every node, cancelling their timers and the mining schedule.
    pub fn stop_all(&mut self) {
        if let Some(key) = self.next_mine.take() {
            self.queue.cancel(key);
        }
        let ids: Vec<PeerId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.dispatch(id, NodeEvent::Stop);
        }
    }

    /// Start, run for the configured duration, stop and report.
    pub fn run(&mut self) -> SimulationReport {
        self.start();
        self.run_until(self.now() + self.config.duration.as_secs_f64());
        self.stop_all();
        self.report()
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            simulated_seconds: self.now(),
            stats: self.stats(),
            traffic: self.traffic(),
            nodes: self.sessions.values().map(NodeSession::statistics).collect(),
        }
    }

    /// Top block of every node that stores blocks.
    pub fn tops(&self) -> BTreeMap<PeerId, BlockId> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.setup().role.handles_inventory())
            .map(|(id, s)| (*id, s.ledger().current_top().id()))
            .collect()
    }

    /// Whether every node that stores blocks holds `id`.
    pub fn all_hold(&self, id: BlockId) -> bool {
        self.sessions
            .values()
            .filter(|s| s.setup().role.handles_inventory())
            .all(|s| s.ledger().contains_id(id))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn dispatch(&mut self, node: PeerId, event: NodeEvent) {
        let now = self.now();
        let actions = match self.sessions.get_mut(&node) {
            Some(session) => {
                session.set_time(now);
                session.handle(event)
            }
            None => {
                warn!(%node, "Event for unknown node dropped");
                return;
            }
        };
        self.stats.actions_generated += actions.len() as u64;
        for action in actions {
            self.process_action(node, action);
        }
    }

    fn process_action(&mut self, from: PeerId, action: Action) {
        match action {
            Action::Send {
                to,
                kind,
                bytes,
                wire_bytes,
            } => {
                if !self.sessions.contains_key(&to) {
                    warn!(%from, %to, %kind, "Send to unknown node dropped");
                    return;
                }
                trace!(%from, %to, %kind, wire_bytes, "Message sent");
                self.network.set_time(self.now());
                self.network.send(from, to, bytes, wire_bytes);
                for delivery in self.network.drain() {
                    self.queue.schedule(
                        delivery.to,
                        delivery.at,
                        ScheduledEvent::Node(NodeEvent::BytesReceived {
                            from: delivery.from,
                            bytes: delivery.bytes,
                        }),
                    );
                }
            }
            Action::SetTimer { id, after } => self.queue.set_timer(from, id, after),
            Action::CancelTimer { id } => self.queue.cancel_timer(from, id),
        }
    }

    fn schedule_next_mine(&mut self) {
        self.next_mine = None;
        if self.stats.blocks_minted >= self.config.blocks_to_mint {
            return;
        }
        let Some(&miner) = self.miners.choose(&mut self.rng) else {
            return;
        };
        // Exponential inter-block times with the configured mean.
        let u: f64 = self.rng.gen();
        let delay = -(1.0 - u).ln() * self.config.block_interval.as_secs_f64();
        let at = self.now() + delay;
        self.next_mine = Some(self.queue.schedule(miner, at, ScheduledEvent::Mine));
    }

    fn mine(&mut self, miner: PeerId) {
        let now = self.now();
        let nonce: u64 = self.rng.gen();
        let Some(session) = self.sessions.get(&miner) else {
            return;
        };
        if !session.is_running() {
            debug!(%miner, "Stopped node skips mining");
            return;
        }

        let top = session.ledger().current_top();
        let parent_miner = match self.config.linkage {
            LinkageRule::MinerIdentity => top.miner_id,
            LinkageRule::SharedParent => top.parent_miner_id,
        };
        let mut block = Block::new(
            top.height + 1,
            miner.0,
            nonce,
            parent_miner,
            self.config.block_size_bytes,
            now,
        );
        for transaction in session
            .transactions()
            .pending(self.config.transactions_per_block)
        {
            block.size_bytes += transaction.size_bytes;
            block.add_transaction(transaction);
        }

        self.stats.blocks_minted += 1;
        info!(
            %miner,
            block = %block.id(),
            transactions = block.transactions.len(),
            time = now,
            "Block mined"
        );
        self.dispatch(miner, NodeEvent::BlockMinted(block));
    }
}

/// Connected random topology: a ring plus random links until every node has
/// `connections` peers where possible. Links are symmetric.
fn build_topology(
    nodes: u32,
    connections: usize,
    rng: &mut StdRng,
) -> BTreeMap<PeerId, BTreeSet<PeerId>> {
    let ids: Vec<PeerId> = (1..=nodes).map(PeerId).collect();
    let mut links: BTreeMap<PeerId, BTreeSet<PeerId>> =
        ids.iter().map(|id| (*id, BTreeSet::new())).collect();

    let connect = |a: PeerId, b: PeerId, links: &mut BTreeMap<PeerId, BTreeSet<PeerId>>| {
        if a != b {
            links.entry(a).or_default().insert(b);
            links.entry(b).or_default().insert(a);
        }
    };

    for pair in ids.windows(2) {
        connect(pair[0], pair[1], &mut links);
    }
    if ids.len() > 2 {
        connect(ids[ids.len() - 1], ids[0], &mut links);
    }

    for id in &ids {
        let mut candidates: Vec<PeerId> = ids
            .iter()
            .copied()
            .filter(|other| other != id && !links[id].contains(other))
            .collect();
        candidates.shuffle(rng);
        for other in candidates {
            if links[id].len() >= connections {
                break;
            }
            if links[&other].len() < connections {
                connect(*id, other, &mut links);
            }
        }
    }
    links
}
