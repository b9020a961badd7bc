//! Role-specific transaction behaviour.

use shared_types::NodeRole;

/// What a node of a given role does with gossip.
pub trait RoleBehavior {
    /// Takes part in block inventory (`INV`, headers, data).
    fn handles_inventory(&self) -> bool;

    /// Processes `REQUEST_TRANS`.
    fn accepts_transaction_requests(&self) -> bool;

    /// Executes unseen transaction requests instead of forwarding them.
    fn executes_transactions(&self) -> bool;

    /// Mints its own transactions on a timer.
    fn originates_transactions(&self) -> bool;

    /// Marks transactions validated when they show up in a stored block.
    fn validates_transactions(&self) -> bool;
}

impl RoleBehavior for NodeRole {
    fn handles_inventory(&self) -> bool {
        !matches!(self, NodeRole::Client)
    }

    fn accepts_transaction_requests(&self) -> bool {
        !matches!(self, NodeRole::Client)
    }

    fn executes_transactions(&self) -> bool {
        matches!(self, NodeRole::Endorser)
    }

    fn originates_transactions(&self) -> bool {
        matches!(self, NodeRole::Client)
    }

    fn validates_transactions(&self) -> bool {
        matches!(self, NodeRole::Committer | NodeRole::Order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_only_originates() {
        let client = NodeRole::Client;
        assert!(client.originates_transactions());
        assert!(!client.handles_inventory());
        assert!(!client.accepts_transaction_requests());
        assert!(!client.executes_transactions());
    }

    #[test]
    fn test_only_endorser_executes() {
        assert!(NodeRole::Endorser.executes_transactions());
        assert!(!NodeRole::Committer.executes_transactions());
        assert!(!NodeRole::Order.executes_transactions());
    }

    #[test]
    fn test_order_behaves_like_committer() {
        let (order, committer) = (NodeRole::Order, NodeRole::Committer);
        assert_eq!(order.handles_inventory(), committer.handles_inventory());
        assert_eq!(
            order.accepts_transaction_requests(),
            committer.accepts_transaction_requests()
        );
        assert_eq!(order.validates_transactions(), committer.validates_transactions());
    }
}
