//! # Transaction Pool
//!
//! Per-node transaction collections.
//!
//! ## Data Structures
//!
//! - `held`: every transaction this node has accepted from a request or
//!   minted itself, keyed by `(nodeId, transId)`
//! - `executed`: transactions this endorser executed, in execution order
//! - `replies`: execution replies received, keyed by
//!   `(nodeId, transId, execution)`
//!
//! Endorsement latency is `now - creation time` at execution, ordering
//! latency the same when an order node forwards, and validation latency the
//! same when a stored block first shows the transaction to a committer.

use shared_types::{Block, NodeId, NodeRole, RunningMean, SimTime, Transaction, TransactionId};
use std::collections::HashMap;
use tracing::debug;

use super::roles::RoleBehavior;
use super::value_objects::{ReplyDisposition, RequestOutcome, TransactionConfig};

#[derive(Debug, Clone)]
pub struct TransactionPool {
    node_id: NodeId,
    role: NodeRole,
    config: TransactionConfig,
    held: HashMap<TransactionId, Transaction>,
    executed: Vec<Transaction>,
    replies: HashMap<(TransactionId, NodeId), Transaction>,
    next_trans_id: u64,
    generated: u64,
    endorsement: RunningMean,
    ordering: RunningMean,
    validation: RunningMean,
}

impl TransactionPool {
    pub fn new(node_id: NodeId, role: NodeRole, config: TransactionConfig) -> Self {
        Self {
            node_id,
            role,
            config,
            held: HashMap::new(),
            executed: Vec::new(),
            replies: HashMap::new(),
            next_trans_id: 1,
            generated: 0,
            endorsement: RunningMean::default(),
            ordering: RunningMean::default(),
            validation: RunningMean::default(),
        }
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Change role before the node starts.
    pub fn set_role(&mut self, role: NodeRole) {
        self.role = role;
    }

    // =========================================================================
    // Admission
    // =========================================================================

    /// Admit one transaction carried by a `REQUEST_TRANS`.
    pub fn admit_request(&mut self, transaction: &Transaction, now: SimTime) -> RequestOutcome {
        if !self.role.accepts_transaction_requests() {
            return RequestOutcome::Ignored;
        }
        if self.has_transaction(transaction.id()) {
            debug!(
                node = self.node_id,
                tx = %transaction.id(),
                "[gl-06] Request for held transaction"
            );
            return RequestOutcome::AlreadyHeld;
        }

        let mut fresh = Transaction::new(
            transaction.node_id,
            transaction.trans_id,
            transaction.timestamp,
        );
        fresh.size_bytes = self.config.transaction_size_bytes;
        self.held.insert(fresh.id(), fresh.clone());

        if self.role.executes_transactions() {
            // Execution only; `validated` is set once a stored block carries it.
            fresh.set_execution(self.node_id);
            self.endorsement.fold(now - fresh.timestamp);
            self.executed.push(fresh.clone());
            debug!(
                node = self.node_id,
                tx = %fresh.id(),
                latency = now - fresh.timestamp,
                "[gl-06] Transaction executed"
            );
            RequestOutcome::Executed(fresh)
        } else {
            if self.role == NodeRole::Order {
                self.ordering.fold(now - fresh.timestamp);
            }
            RequestOutcome::Forward(fresh)
        }
    }

    /// Admit one transaction carried by a `REPLY_TRANS`.
    pub fn admit_reply(&mut self, transaction: &Transaction) -> ReplyDisposition {
        let key = (transaction.id(), transaction.execution);
        if self.replies.contains_key(&key) {
            return ReplyDisposition::Duplicate;
        }
        if transaction.node_id == self.node_id {
            return ReplyDisposition::OwnOrigin;
        }
        self.replies.insert(key, transaction.clone());
        ReplyDisposition::Record
    }

    /// Mint the next transaction of this node.
    pub fn create_transaction(&mut self, now: SimTime) -> Transaction {
        let mut transaction = Transaction::new(self.node_id, self.next_trans_id, now);
        transaction.size_bytes = self.config.transaction_size_bytes;
        self.next_trans_id += 1;
        self.generated += 1;
        self.held.insert(transaction.id(), transaction.clone());
        transaction
    }

    /// Mark every held transaction found in `block` as validated.
    ///
    /// Returns how many were newly validated.
    pub fn validate_from_block(&mut self, block: &Block, now: SimTime) -> usize {
        if !self.role.validates_transactions() {
            return 0;
        }
        let mut validated = 0;
        for carried in &block.transactions {
            if let Some(held) = self.held.get_mut(&carried.id()) {
                if !held.validated {
                    held.mark_validated();
                    self.validation.fold(now - held.timestamp);
                    validated += 1;
                }
            }
        }
        validated
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn has_transaction(&self, id: TransactionId) -> bool {
        self.held.contains_key(&id)
    }

    pub fn has_reply(&self, id: TransactionId, execution: NodeId) -> bool {
        self.replies.contains_key(&(id, execution))
    }

    pub fn has_validated(&self, id: TransactionId) -> bool {
        self.held.get(&id).is_some_and(|t| t.validated)
    }

    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.held.get(&id)
    }

    /// Held transactions no block has validated yet, oldest id first.
    pub fn pending(&self, limit: usize) -> Vec<Transaction> {
        let mut pending: Vec<&Transaction> = self.held.values().filter(|t| !t.validated).collect();
        pending.sort_by_key(|t| t.id());
        pending.into_iter().take(limit).cloned().collect()
    }

    pub fn executed(&self) -> &[Transaction] {
        &self.executed
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn endorsement(&self) -> RunningMean {
        self.endorsement
    }

    pub fn ordering(&self) -> RunningMean {
        self.ordering
    }

    pub fn validation(&self) -> RunningMean {
        self.validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(node_id: NodeId, role: NodeRole) -> TransactionPool {
        TransactionPool::new(node_id, role, TransactionConfig::default())
    }

    #[test]
    fn test_endorser_executes_unseen_request() {
        let mut endorser = pool(5, NodeRole::Endorser);
        let request = Transaction::new(3, 9, 10.0);

        let outcome = endorser.admit_request(&request, 12.5);
        let RequestOutcome::Executed(executed) = outcome else {
            panic!("expected execution, got {outcome:?}");
        };
        assert_eq!(executed.execution, 5);
        assert_eq!(executed.id(), request.id());
        assert!(!executed.validated);
        assert!(!endorser.get(request.id()).unwrap().validated);
        assert_eq!(endorser.executed().len(), 1);
        assert_eq!(endorser.endorsement().count(), 1);
        assert!((endorser.endorsement().mean() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_endorsement_mean_folds_over_requests() {
        let mut endorser = pool(5, NodeRole::Endorser);
        endorser.admit_request(&Transaction::new(3, 1, 0.0), 2.0);
        endorser.admit_request(&Transaction::new(3, 2, 0.0), 4.0);
        assert!((endorser.endorsement().mean() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_repeat_request_is_already_held() {
        let mut committer = pool(1, NodeRole::Committer);
        let request = Transaction::new(3, 9, 0.0);
        assert!(matches!(
            committer.admit_request(&request, 1.0),
            RequestOutcome::Forward(_)
        ));
        assert_eq!(
            committer.admit_request(&request, 2.0),
            RequestOutcome::AlreadyHeld
        );
        assert_eq!(committer.held_count(), 1);
    }

    #[test]
    fn test_forwarded_transaction_is_not_executed() {
        let mut order = pool(2, NodeRole::Order);
        let RequestOutcome::Forward(tx) = order.admit_request(&Transaction::new(3, 9, 0.0), 1.0)
        else {
            panic!("order should forward");
        };
        assert_eq!(tx.execution, 0);
        assert!(order.executed().is_empty());
        assert_eq!(order.endorsement().count(), 0);
        assert_eq!(order.ordering().count(), 1);
        assert!((order.ordering().mean() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_client_ignores_requests() {
        let mut client = pool(4, NodeRole::Client);
        assert_eq!(
            client.admit_request(&Transaction::new(3, 9, 0.0), 1.0),
            RequestOutcome::Ignored
        );
        assert_eq!(client.held_count(), 0);
    }

    #[test]
    fn test_reply_dispositions() {
        let mut committer = pool(1, NodeRole::Committer);
        let mut reply = Transaction::new(3, 9, 0.0);
        reply.set_execution(5);

        assert_eq!(committer.admit_reply(&reply), ReplyDisposition::Record);
        assert_eq!(committer.admit_reply(&reply), ReplyDisposition::Duplicate);
        assert!(committer.has_reply(reply.id(), 5));

        // A different endorser's execution is a separate reply.
        reply.set_execution(6);
        assert_eq!(committer.admit_reply(&reply), ReplyDisposition::Record);
        assert_eq!(committer.reply_count(), 2);
    }

    #[test]
    fn test_own_origin_reply_is_not_recorded() {
        let mut client = pool(3, NodeRole::Client);
        let mut reply = Transaction::new(3, 1, 0.0);
        reply.set_execution(5);
        assert_eq!(client.admit_reply(&reply), ReplyDisposition::OwnOrigin);
        assert!(!client.has_reply(reply.id(), 5));
        assert_eq!(client.admit_reply(&reply), ReplyDisposition::OwnOrigin);
    }

    #[test]
    fn test_client_ids_start_at_one() {
        let mut client = pool(3, NodeRole::Client);
        let first = client.create_transaction(1.0);
        let second = client.create_transaction(2.0);
        assert_eq!(first.trans_id, 1);
        assert_eq!(second.trans_id, 2);
        assert_eq!(first.node_id, 3);
        assert_eq!(client.generated(), 2);
        assert!(client.has_transaction(second.id()));
    }

    #[test]
    fn test_validate_from_block() {
        let mut committer = pool(1, NodeRole::Committer);
        let tx = Transaction::new(3, 9, 1.0);
        committer.admit_request(&tx, 1.5);

        let mut block = Block::new(1, 7, 0, 0, 100, 2.0);
        block.add_transaction(tx.clone());
        block.add_transaction(Transaction::new(8, 8, 1.0));

        assert_eq!(committer.validate_from_block(&block, 4.0), 1);
        assert!(committer.has_validated(tx.id()));
        assert!((committer.validation().mean() - 3.0).abs() < 1e-12);

        // Already validated transactions are not folded again.
        assert_eq!(committer.validate_from_block(&block, 9.0), 0);
        assert_eq!(committer.validation().count(), 1);
    }

    #[test]
    fn test_pending_excludes_validated() {
        let mut committer = pool(1, NodeRole::Committer);
        for trans_id in [3, 1, 2] {
            committer.admit_request(&Transaction::new(4, trans_id, 0.0), 0.5);
        }
        let mut block = Block::new(1, 7, 0, 0, 100, 1.0);
        block.add_transaction(Transaction::new(4, 1, 0.0));
        committer.validate_from_block(&block, 2.0);

        let ids: Vec<u64> = committer.pending(10).iter().map(|t| t.trans_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(committer.pending(1).len(), 1);
    }

    #[test]
    fn test_endorser_does_not_validate() {
        let mut endorser = pool(5, NodeRole::Endorser);
        let tx = Transaction::new(3, 9, 1.0);
        endorser.admit_request(&tx, 1.5);
        let mut block = Block::new(1, 7, 0, 0, 100, 2.0);
        block.add_transaction(tx);
        assert_eq!(endorser.validate_from_block(&block, 4.0), 0);
    }
}
