//! # Block Propagation Scenarios
//!
//! Blocks mined on one node must reach every block-storing node exactly
//! once per node, over both announcement variants, including when a block
//! shows up before its parent.

#[cfg(test)]
mod tests {
    use gl_05_gossip_protocol::{MessageKind, NodeEvent, WireSizes};
    use node_runtime::{Simulation, SimulationConfig};
    use shared_types::{Block, BlockId, NodeRole, PeerId, ProtocolVariant};

    use crate::integration::{manual_mining, topology};

    const COMMITTERS_4: [NodeRole; 4] = [NodeRole::Committer; 4];

    fn line(protocol: ProtocolVariant) -> Simulation {
        let setups = topology(&COMMITTERS_4, &[(1, 2), (2, 3), (3, 4)], protocol);
        Simulation::with_setups(manual_mining(), setups).unwrap()
    }

    // =========================================================================
    // STANDARD (INV) GOSSIP
    // =========================================================================

    #[test]
    fn test_line_topology_converges() {
        let mut simulation = line(ProtocolVariant::Standard);
        simulation.start();
        for at in [1.0, 3.0, 5.0] {
            simulation.mine_at(PeerId(1), at);
        }
        simulation.run_until(30.0);

        assert!(simulation.all_hold(BlockId::new(3, 1)));
        assert!(simulation
            .tops()
            .values()
            .all(|top| *top == BlockId::new(3, 1)));
        let report = simulation.report();
        assert_eq!(report.total_block_timeouts(), 0);
        assert_eq!(report.stats.blocks_minted, 3);
    }

    #[test]
    fn test_each_block_requested_once_per_node() {
        // Full mesh: every node hears every INV from several peers.
        let links = [(1, 2), (1, 3), (1, 4), (1, 5), (2, 3), (2, 4), (2, 5), (3, 4), (3, 5), (4, 5)];
        let setups = topology(&[NodeRole::Committer; 5], &links, ProtocolVariant::Standard);
        let mut simulation = Simulation::with_setups(manual_mining(), setups).unwrap();
        simulation.start();
        simulation.mine_at(PeerId(1), 1.0);
        simulation.mine_at(PeerId(1), 2.0);
        simulation.run_until(20.0);

        let get_data = WireSizes::default().message_bytes(MessageKind::GetData, 1, 0);
        for session in simulation.sessions() {
            let stats = session.statistics();
            if session.id() == PeerId(1) {
                assert_eq!(stats.get_data.sent, 0, "miner never requests its own blocks");
            } else {
                assert_eq!(stats.get_data.sent, 2 * get_data, "node {}", session.id());
            }
            assert_eq!(stats.total_blocks, 3);
        }
    }

    // =========================================================================
    // SENDHEADERS GOSSIP
    // =========================================================================

    #[test]
    fn test_send_headers_replaces_inventory() {
        let mut simulation = line(ProtocolVariant::SendHeaders);
        simulation.start();
        simulation.mine_at(PeerId(1), 1.0);
        simulation.mine_at(PeerId(1), 4.0);
        simulation.run_until(30.0);

        assert!(simulation.all_hold(BlockId::new(2, 1)));
        let report = simulation.report();
        for stats in &report.nodes {
            assert_eq!(stats.inv.sent, 0);
            assert_eq!(stats.get_headers.sent, 0);
        }
        assert!(report.nodes.iter().any(|stats| stats.headers.sent > 0));
    }

    #[test]
    fn test_random_topologies_converge_with_both_variants() {
        for protocol in [ProtocolVariant::Standard, ProtocolVariant::SendHeaders] {
            for seed in 1..=3 {
                let config = SimulationConfig {
                    protocol,
                    seed,
                    ..SimulationConfig::for_testing()
                };
                let mut simulation = Simulation::new(config).unwrap();
                let report = simulation.run();

                let tops = simulation.tops();
                let first = tops.values().next().copied().unwrap();
                assert!(
                    tops.values().all(|top| *top == first),
                    "{protocol} seed {seed}: {tops:?}"
                );
                assert_eq!(first.height, report.stats.blocks_minted);
            }
        }
    }

    // =========================================================================
    // ORPHANS
    // =========================================================================

    #[test]
    fn test_orphan_advertised_once_parent_arrives() {
        let setups = topology(&[NodeRole::Committer; 3], &[(1, 2), (2, 3)], ProtocolVariant::Standard);
        let mut simulation = Simulation::with_setups(manual_mining(), setups).unwrap();
        simulation.start();

        let parent = Block::new(1, 2, 7, 0, 1_000, 0.5);
        let child = Block::new(2, 2, 8, 2, 1_000, 0.6);
        simulation.inject(PeerId(2), 1.0, NodeEvent::BlockMinted(child));
        simulation.inject(PeerId(2), 2.0, NodeEvent::BlockMinted(parent));

        simulation.run_until(1.5);
        let miner = simulation.session(PeerId(2)).unwrap();
        assert_eq!(miner.orphans().len(), 1);
        assert_eq!(miner.statistics().inv.sent, 0, "orphans are not advertised");

        simulation.run_until(30.0);
        assert!(simulation.session(PeerId(2)).unwrap().orphans().is_empty());
        assert!(simulation
            .tops()
            .values()
            .all(|top| *top == BlockId::new(2, 2)));
    }

    #[test]
    fn test_stopped_nodes_cancel_outstanding_timers() {
        let mut simulation = line(ProtocolVariant::Standard);
        simulation.start();
        simulation.mine_at(PeerId(1), 1.0);
        simulation.run_until(10.0);
        simulation.stop_all();

        for session in simulation.sessions() {
            assert!(!session.is_running());
            assert_eq!(session.armed_timers().count(), 0);
        }
    }
}
