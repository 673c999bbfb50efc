//! Subscriber registry: attached observer connections and their channels
//!
//! Each observer connection is represented by an unbounded channel sender
//! plus a monotonically increasing id assigned at attach time. Fan-out never
//! awaits a subscriber — sends go into the channel and the connection's own
//! transport buffering absorbs the rest. A send into a closed channel marks
//! that subscriber dead; the caller prunes it after the fan-out pass.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

/// Identifier of one attached observer connection.
pub type SubscriberId = u64;

/// One attached observer: id + channel into its streaming connection.
struct Subscriber {
    id: SubscriberId,
    sender: mpsc::UnboundedSender<Arc<str>>,
}

/// Set of currently attached observers, keyed by id.
///
/// Not internally synchronized — the owning bus guards it with the same
/// critical section that serializes publish, so iteration can never observe
/// a half-updated member list.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: SubscriberId,
    subscribers: Vec<Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel, returning its strictly increasing id.
    pub fn add(&mut self, sender: mpsc::UnboundedSender<Arc<str>>) -> SubscriberId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push(Subscriber { id, sender });
        debug!(id, total = self.subscribers.len(), "subscriber attached");
        id
    }

    /// Deregister by id. Idempotent: removing twice or removing an unknown
    /// id is a no-op.
    pub fn remove(&mut self, id: SubscriberId) {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        if self.subscribers.len() != before {
            debug!(id, total = self.subscribers.len(), "subscriber detached");
        }
    }

    /// Deliver one serialized event to every subscriber, in registration
    /// order. Returns the ids whose channel was closed, for pruning; a dead
    /// subscriber never affects delivery to the others.
    pub fn broadcast(&self, line: &Arc<str>) -> Vec<SubscriberId> {
        let mut dead = Vec::new();
        for subscriber in &self.subscribers {
            if subscriber.sender.send(Arc::clone(line)).is_err() {
                dead.push(subscriber.id);
            }
        }
        dead
    }

    /// Drop every registered channel, ending each observer's stream.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut registry = SubscriberRegistry::new();
        let (tx, _rx1) = mpsc::unbounded_channel();
        let a = registry.add(tx);
        let (tx, _rx2) = mpsc::unbounded_channel();
        let b = registry.add(tx);
        registry.remove(a);
        let (tx, _rx3) = mpsc::unbounded_channel();
        let c = registry.add(tx);
        assert!(a < b && b < c);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.add(tx);
        registry.remove(id);
        registry.remove(id);
        registry.remove(999);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_reaches_all() {
        let mut registry = SubscriberRegistry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.add(tx1);
        registry.add(tx2);

        let dead = registry.broadcast(&line("x"));
        assert!(dead.is_empty());
        assert_eq!(rx1.try_recv().unwrap().as_ref(), "x");
        assert_eq!(rx2.try_recv().unwrap().as_ref(), "x");
    }

    #[test]
    fn test_broadcast_reports_dead_channels() {
        let mut registry = SubscriberRegistry::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let dead_id = registry.add(tx1);
        registry.add(tx2);
        drop(rx1);

        let dead = registry.broadcast(&line("x"));
        assert_eq!(dead, vec![dead_id]);
        // the live subscriber still got the event
        assert_eq!(rx2.try_recv().unwrap().as_ref(), "x");
    }
}
