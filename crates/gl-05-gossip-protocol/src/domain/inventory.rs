//! # Inventory Tracker
//!
//! Request state of every announced item the node does not have yet.
//!
//! ```text
//! Unknown ──announce──→ Announced ──mark_requested──→ Requested ──resolve──→ (removed)
//!                          ↑                              │
//!                          └────── expire: Retry ─────────┤
//!                                                         └─ expire: Abandoned → (removed)
//! ```
//!
//! At most one request per key is outstanding: only the first announcement
//! asks the caller to request; later announcers are queued as fallbacks for
//! retries. Announcers are tried in the order they announced.

use shared_types::PeerId;
use std::collections::HashMap;
use std::hash::Hash;

/// State kept for one announced item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InventoryEntry {
    /// Peers that announced the item, in arrival order.
    pub announcers: Vec<PeerId>,
    /// Peer the outstanding request went to.
    pub requested_from: Option<PeerId>,
    /// Requests issued so far.
    pub attempts: u32,
    /// Whether a timeout is armed for the outstanding request.
    pub timer_armed: bool,
}

/// What the caller should do after an announcement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// First announcement: request the item from this peer.
    Request,
    /// Already tracked; the peer was queued as a fallback.
    AlreadyTracked,
}

/// What the caller should do when a request timeout fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// The key is not tracked any more; the timer was stale.
    Stale,
    /// Re-request from the next announcer.
    Retry { peer: PeerId },
    /// Attempts or announcers exhausted; the entry was dropped.
    Abandoned,
}

/// Deduplication and retry engine for announced items.
#[derive(Clone, Debug)]
pub struct InventoryTracker<K> {
    entries: HashMap<K, InventoryEntry>,
}

impl<K> Default for InventoryTracker<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> InventoryTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `peer` announced `key`.
    pub fn announce(&mut self, key: K, peer: PeerId) -> AnnounceOutcome {
        match self.entries.get_mut(&key) {
            Some(entry) => {
                if !entry.announcers.contains(&peer) {
                    entry.announcers.push(peer);
                }
                AnnounceOutcome::AlreadyTracked
            }
            None => {
                self.entries.insert(
                    key,
                    InventoryEntry {
                        announcers: vec![peer],
                        ..InventoryEntry::default()
                    },
                );
                AnnounceOutcome::Request
            }
        }
    }

    /// Record that a request for `key` went to `peer` and a timeout was armed.
    /// Untracked keys are ignored.
    pub fn mark_requested(&mut self, key: &K, peer: PeerId) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.requested_from = Some(peer);
            entry.attempts += 1;
            entry.timer_armed = true;
        }
    }

    /// The item arrived: forget it. Returns the entry so the caller can
    /// cancel an armed timeout.
    pub fn resolve(&mut self, key: &K) -> Option<InventoryEntry> {
        self.entries.remove(key)
    }

    /// The timeout for `key` fired.
    ///
    /// Retries while fewer than `max_attempts` requests were issued and an
    /// untried announcer remains; otherwise drops the entry.
    pub fn expire(&mut self, key: &K, max_attempts: u32) -> ExpiryOutcome {
        let Some(entry) = self.entries.get_mut(key) else {
            return ExpiryOutcome::Stale;
        };
        entry.timer_armed = false;

        let next = entry.attempts as usize;
        match entry.announcers.get(next) {
            Some(&peer) if entry.attempts < max_attempts => ExpiryOutcome::Retry { peer },
            _ => {
                self.entries.remove(key);
                ExpiryOutcome::Abandoned
            }
        }
    }

    pub fn is_tracked(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&InventoryEntry> {
        self.entries.get(key)
    }

    /// Number of tracked items with a request in flight.
    pub fn outstanding(&self) -> usize {
        self.entries.values().filter(|e| e.timer_armed).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, returning the keys that had a timeout armed.
    pub fn clear(&mut self) -> Vec<K> {
        self.entries
            .drain()
            .filter(|(_, e)| e.timer_armed)
            .map(|(k, _)| k)
            .collect()
    }
}
