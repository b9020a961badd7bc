//! Inbound ports (API) for the gossip subsystem.

use shared_types::{Block, PeerId, SimTime};

use super::outbound::{Action, TimerId};

/// Everything that can happen to a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeEvent {
    /// Activate with the configured setup.
    Start,
    /// Deactivate; outstanding timers are cancelled.
    Stop,
    /// Bytes arrived on the connection from `from`.
    BytesReceived { from: PeerId, bytes: Vec<u8> },
    /// A timer armed through `Action::SetTimer` expired.
    TimerFired(TimerId),
    /// This node mined a block.
    BlockMinted(Block),
}

/// A gossip node driven by a runner.
///
/// `handle` never blocks and performs no I/O: every send and timer is
/// returned as an `Action` for the runner to execute. The runner calls
/// `set_time` before each `handle`.
pub trait GossipNode {
    fn handle(&mut self, event: NodeEvent) -> Vec<Action>;

    fn set_time(&mut self, now: SimTime);

    fn now(&self) -> SimTime;
}
