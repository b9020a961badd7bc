//! Cross-crate scenarios driven through `node_runtime::Simulation`.

pub mod block_propagation;
pub mod transaction_flow;

use gl_05_gossip_protocol::NodeSetup;
use node_runtime::SimulationConfig;
use shared_types::{NodeRole, PeerId, ProtocolVariant};

/// Setups for an explicit undirected topology. `roles[i]` is the role of
/// node `i + 1`.
pub fn topology(roles: &[NodeRole], links: &[(u32, u32)], protocol: ProtocolVariant) -> Vec<NodeSetup> {
    (1..=roles.len() as u32)
        .map(|id| {
            let peers = links.iter().filter_map(|&(a, b)| {
                if a == id {
                    Some(PeerId(b))
                } else if b == id {
                    Some(PeerId(a))
                } else {
                    None
                }
            });
            NodeSetup::new(id, roles[id as usize - 1])
                .with_peers(peers)
                .with_protocol(protocol)
        })
        .collect()
}

/// Test configuration with automatic mining turned off.
pub fn manual_mining() -> SimulationConfig {
    SimulationConfig {
        blocks_to_mint: 0,
        ..SimulationConfig::for_testing()
    }
}
