//! # Event Queue
//!
//! Discrete-event queue with deterministic ordering.
//!
//! Events are ordered by:
//! 1. Time (earlier first)
//! 2. Node (lower id first)
//! 3. Sequence number (FIFO for the same time and node)
//!
//! Node timers are tracked by `(node, TimerId)` so that setting an armed
//! timer replaces it and cancelling removes the queued fire.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use gl_05_gossip_protocol::{NodeEvent, TimerId, TimerScheduler};
use shared_types::{PeerId, SimTime};

/// Key for ordering events in the queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventKey {
    pub time: SimTime,
    pub node: PeerId,
    pub sequence: u64,
}

impl Eq for EventKey {}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.node.cmp(&other.node))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Something scheduled for a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledEvent {
    /// Handed to the node's session as is.
    Node(NodeEvent),
    /// The node mines a block on its current top.
    Mine,
}

/// Time-ordered queue of node events.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: BTreeMap<EventKey, ScheduledEvent>,
    timers: HashMap<(PeerId, TimerId), EventKey>,
    sequence: u64,
    now: SimTime,
    timers_set: u64,
    timers_cancelled: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the last popped event.
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn timers_set(&self) -> u64 {
        self.timers_set
    }

    pub fn timers_cancelled(&self) -> u64 {
        self.timers_cancelled
    }

    /// Queue `event` for `node` at absolute time `at`.
    ///
    /// Times in the past are clamped to now.
    pub fn schedule(&mut self, node: PeerId, at: SimTime, event: ScheduledEvent) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time: at.max(self.now),
            node,
            sequence: self.sequence,
        };
        self.queue.insert(key, event);
        key
    }

    pub fn schedule_after(
        &mut self,
        node: PeerId,
        delay: Duration,
        event: ScheduledEvent,
    ) -> EventKey {
        self.schedule(node, self.now + delay.as_secs_f64(), event)
    }

    /// Pop the next event due no later than `end`, advancing the clock.
    pub fn pop_until(&mut self, end: SimTime) -> Option<(EventKey, ScheduledEvent)> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.time > end {
            return None;
        }
        let (key, event) = self.queue.pop_first()?;
        self.now = key.time;
        if let ScheduledEvent::Node(NodeEvent::TimerFired(id)) = &event {
            if self.timers.get(&(key.node, *id)) == Some(&key) {
                self.timers.remove(&(key.node, *id));
            }
        }
        Some((key, event))
    }

    /// Remove a queued event. Returns whether it was still queued.
    pub fn cancel(&mut self, key: EventKey) -> bool {
        self.queue.remove(&key).is_some()
    }

    /// Move the clock forward without popping anything.
    pub fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Whether `node` has `id` armed.
    pub fn is_armed(&self, node: PeerId, id: TimerId) -> bool {
        self.timers.contains_key(&(node, id))
    }

    /// Drop every queued event for `node`.
    pub fn remove_node(&mut self, node: PeerId) {
        self.queue.retain(|key, _| key.node != node);
        self.timers.retain(|(owner, _), _| *owner != node);
    }
}

impl TimerScheduler for EventQueue {
    fn set_timer(&mut self, node: PeerId, id: TimerId, after: Duration) {
        if let Some(previous) = self.timers.remove(&(node, id)) {
            self.queue.remove(&previous);
        }
        let key = self.schedule_after(node, after, ScheduledEvent::Node(NodeEvent::TimerFired(id)));
        self.timers.insert((node, id), key);
        self.timers_set += 1;
    }

    fn cancel_timer(&mut self, node: PeerId, id: TimerId) {
        if let Some(key) = self.timers.remove(&(node, id)) {
            self.queue.remove(&key);
            self.timers_cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::BlockId;

    fn key(time: SimTime, node: u32, sequence: u64) -> EventKey {
        EventKey {
            time,
            node: PeerId(node),
            sequence,
        }
    }

    #[test]
    fn test_event_key_ordering() {
        assert!(key(1.0, 5, 9) < key(2.0, 0, 1));
        assert!(key(1.0, 0, 9) < key(1.0, 1, 1), "Lower node first");
        assert!(key(1.0, 1, 1) < key(1.0, 1, 2), "FIFO within a node");
    }

    #[test]
    fn test_pop_until_respects_end_time() {
        let mut queue = EventQueue::new();
        queue.schedule(PeerId(1), 2.0, ScheduledEvent::Mine);
        queue.schedule(PeerId(1), 1.0, ScheduledEvent::Node(NodeEvent::Start));

        let (first, event) = queue.pop_until(5.0).unwrap();
        assert_eq!(first.time, 1.0);
        assert_eq!(event, ScheduledEvent::Node(NodeEvent::Start));
        assert!(queue.pop_until(1.5).is_none());
        assert_eq!(queue.now(), 1.0);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_setting_armed_timer_replaces_it() {
        let mut queue = EventQueue::new();
        let id = TimerId::InventoryTimeout(BlockId::new(1, 2));
        queue.set_timer(PeerId(1), id, Duration::from_secs(5));
        queue.set_timer(PeerId(1), id, Duration::from_secs(8));

        assert_eq!(queue.len(), 1);
        let (key, _) = queue.pop_until(100.0).unwrap();
        assert_eq!(key.time, 8.0);
        assert!(!queue.is_armed(PeerId(1), id));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut queue = EventQueue::new();
        let id = TimerId::NextTransaction;
        queue.set_timer(PeerId(1), id, Duration::from_secs(1));
        queue.set_timer(PeerId(2), id, Duration::from_secs(1));
        queue.cancel_timer(PeerId(1), id);

        let (key, _) = queue.pop_until(10.0).unwrap();
        assert_eq!(key.node, PeerId(2));
        assert!(queue.pop_until(10.0).is_none());
        assert_eq!(queue.timers_cancelled(), 1);
    }

    #[test]
    fn test_past_times_are_clamped() {
        let mut queue = EventQueue::new();
        queue.schedule(PeerId(1), 3.0, ScheduledEvent::Mine);
        queue.pop_until(10.0);
        let key = queue.schedule(PeerId(1), 1.0, ScheduledEvent::Mine);
        assert_eq!(key.time, 3.0);
    }
}
