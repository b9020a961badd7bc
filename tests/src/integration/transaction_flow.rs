//! # Transaction Flow Scenarios
//!
//! Clients mint transactions, endorsers execute them and reply to whoever
//! asked, committers validate them once a stored block carries them.

#[cfg(test)]
mod tests {
    use node_runtime::Simulation;
    use shared_types::{NodeRole, PeerId, ProtocolVariant};

    use crate::integration::{manual_mining, topology};

    // Client 1, endorser 2, committers 3 and 4.
    const ROLES: [NodeRole; 4] = [
        NodeRole::Client,
        NodeRole::Endorser,
        NodeRole::Committer,
        NodeRole::Committer,
    ];

    fn network(links: &[(u32, u32)]) -> Simulation {
        let setups = topology(&ROLES, links, ProtocolVariant::Standard);
        Simulation::with_setups(manual_mining(), setups).unwrap()
    }

    #[test]
    fn test_endorser_replies_to_adjacent_client() {
        let mut simulation = network(&[(1, 2), (1, 3), (2, 3), (3, 4)]);
        simulation.start();
        simulation.run_until(2.0);

        let client = simulation.session(PeerId(1)).unwrap().statistics();
        assert!(client.node_generated_transaction > 0);
        assert!(client.get_data.received > 0, "client saw execution replies");

        let endorser = simulation.session(PeerId(2)).unwrap();
        assert!(!endorser.transactions().executed().is_empty());
        assert!(endorser.statistics().mean_endorsement_time > 0.0);
    }

    #[test]
    fn test_replies_go_to_the_requesting_peer() {
        // The client reaches the endorser only through committer 3.
        let mut simulation = network(&[(1, 3), (2, 3), (3, 4)]);
        simulation.start();
        simulation.run_until(2.0);

        let relay = simulation.session(PeerId(3)).unwrap();
        assert!(relay.transactions().reply_count() > 0);
        let client = simulation.session(PeerId(1)).unwrap().statistics();
        assert_eq!(client.get_data.received, 0);
    }

    #[test]
    fn test_mined_transactions_are_validated_by_committers() {
        let mut simulation = network(&[(1, 2), (1, 3), (2, 3), (3, 4)]);
        assert_eq!(simulation.miners(), &[PeerId(3)]);
        simulation.start();
        simulation.mine_at(PeerId(3), 3.0);
        simulation.mine_at(PeerId(3), 6.0);
        simulation.run_until(10.0);

        let miner = simulation.session(PeerId(3)).unwrap();
        let first = miner.ledger().return_block(1, 3);
        assert!(!first.transactions.is_empty());

        let committer = simulation.session(PeerId(4)).unwrap();
        assert!(committer.ledger().contains_id(first.id()));
        assert!(committer.transactions().validation().count() > 0);
        assert!(committer.statistics().mean_validation_time > 0.0);

        // Endorsers and clients never validate.
        assert_eq!(
            simulation
                .session(PeerId(2))
                .unwrap()
                .transactions()
                .validation()
                .count(),
            0
        );
    }
}
