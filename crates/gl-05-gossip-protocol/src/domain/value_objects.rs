//! Value objects for gossip configuration and node setup.

use gl_02_ledger_store::LedgerConfig;
use gl_06_transaction_pool::TransactionConfig;
use shared_types::{NodeId, NodeRole, PeerId, ProtocolVariant};
use std::collections::HashMap;
use std::time::Duration;

use crate::events::MessageKind;

/// Accounted wire sizes, in bytes.
///
/// Statistics charge messages by these constants rather than by the length
/// of the JSON actually exchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WireSizes {
    /// Fixed message header.
    pub message_header: u64,
    /// Item count field.
    pub count: u64,
    /// One inventory entry (`INV`, `GET_DATA`, transaction messages).
    pub inventory: u64,
    /// One `GET_HEADERS` entry.
    pub get_headers: u64,
    /// One header in `HEADERS`.
    pub headers: u64,
}

impl Default for WireSizes {
    fn default() -> Self {
        Self {
            message_header: 90,
            count: 4,
            inventory: 36,
            get_headers: 72,
            headers: 81,
        }
    }
}

impl WireSizes {
    /// Accounted size of a message of `kind` listing `items` entries.
    ///
    /// `block_bytes` is the summed block size and only matters for `BLOCK`.
    pub fn message_bytes(&self, kind: MessageKind, items: usize, block_bytes: u64) -> u64 {
        let items = items as u64;
        match kind {
            MessageKind::GetHeaders => self.message_header + self.count + items * self.get_headers,
            MessageKind::Headers => self.message_header + self.count + items * self.headers,
            MessageKind::Block => self.message_header + block_bytes,
            _ => self.message_header + self.count + items * self.inventory,
        }
    }
}

/// Gossip protocol configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct GossipConfig {
    /// How long a block request may stay unanswered.
    pub inv_timeout: Duration,
    /// Requests issued per item before it is abandoned.
    pub max_request_attempts: u32,
    /// Delay between receiving a block and storing it.
    pub validation_delay: Duration,
    pub wire: WireSizes,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            inv_timeout: Duration::from_secs(120),
            max_request_attempts: 3,
            validation_delay: Duration::ZERO,
            wire: WireSizes::default(),
        }
    }
}

impl GossipConfig {
    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            inv_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }
}

/// Everything a node session is configured with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionConfig {
    pub gossip: GossipConfig,
    pub ledger: LedgerConfig,
    pub transactions: TransactionConfig,
}

impl SessionConfig {
    pub fn for_testing() -> Self {
        Self {
            gossip: GossipConfig::for_testing(),
            ledger: LedgerConfig::default(),
            transactions: TransactionConfig::for_testing(),
        }
    }
}

/// Link speeds of a node, in Mbps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InternetSpeed {
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

impl Default for InternetSpeed {
    fn default() -> Self {
        Self {
            download_mbps: 8.0,
            upload_mbps: 8.0,
        }
    }
}

impl InternetSpeed {
    pub fn symmetric(mbps: f64) -> Self {
        Self {
            download_mbps: mbps,
            upload_mbps: mbps,
        }
    }

    pub fn download_bytes_per_sec(&self) -> f64 {
        self.download_mbps * 1_000_000.0 / 8.0
    }

    pub fn upload_bytes_per_sec(&self) -> f64 {
        self.upload_mbps * 1_000_000.0 / 8.0
    }
}

/// Per-node parameters applied before the node starts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeSetup {
    pub node_id: NodeId,
    pub peers: Vec<PeerId>,
    /// Known speeds of each peer.
    pub peer_speeds: HashMap<PeerId, InternetSpeed>,
    pub internet_speed: InternetSpeed,
    pub role: NodeRole,
    pub protocol: ProtocolVariant,
}

impl NodeSetup {
    pub fn new(node_id: NodeId, role: NodeRole) -> Self {
        Self {
            node_id,
            role,
            ..Self::default()
        }
    }

    pub fn with_peers(mut self, peers: impl IntoIterator<Item = PeerId>) -> Self {
        self.peers = peers.into_iter().collect();
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolVariant) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_internet_speed(mut self, speed: InternetSpeed) -> Self {
        self.internet_speed = speed;
        self
    }

    /// Bytes per second this node can push to `peer`: the lower of our
    /// upload and the peer's download.
    pub fn link_rate(&self, peer: PeerId) -> f64 {
        let upload = self.internet_speed.upload_bytes_per_sec();
        match self.peer_speeds.get(&peer) {
            Some(speed) => upload.min(speed.download_bytes_per_sec()),
            None => upload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_sizes_by_kind() {
        let wire = WireSizes::default();
        assert_eq!(wire.message_bytes(MessageKind::Inv, 1, 0), 90 + 4 + 36);
        assert_eq!(wire.message_bytes(MessageKind::GetData, 2, 0), 90 + 4 + 72);
        assert_eq!(wire.message_bytes(MessageKind::GetHeaders, 2, 0), 90 + 4 + 144);
        assert_eq!(wire.message_bytes(MessageKind::Headers, 1, 0), 90 + 4 + 81);
        assert_eq!(wire.message_bytes(MessageKind::Block, 3, 500), 90 + 500);
        assert_eq!(wire.message_bytes(MessageKind::RequestTrans, 1, 0), 130);
    }

    #[test]
    fn test_default_inv_timeout_is_two_minutes() {
        assert_eq!(GossipConfig::default().inv_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_speed_conversion() {
        let speed = InternetSpeed::symmetric(8.0);
        assert_eq!(speed.download_bytes_per_sec(), 1_000_000.0);
        assert_eq!(speed.upload_bytes_per_sec(), 1_000_000.0);
    }

    #[test]
    fn test_link_rate_takes_bottleneck() {
        let mut setup = NodeSetup::new(0, NodeRole::Committer)
            .with_internet_speed(InternetSpeed::symmetric(16.0));
        setup
            .peer_speeds
            .insert(PeerId(1), InternetSpeed::symmetric(8.0));
        assert_eq!(setup.link_rate(PeerId(1)), 1_000_000.0);
        assert_eq!(setup.link_rate(PeerId(2)), 2_000_000.0);
    }
}
