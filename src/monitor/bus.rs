//! The event bus: publish, buffer, fan out
//!
//! [`EventBus`] is the façade producers talk to. `emit` stamps and
//! serializes an event, appends it to the replay buffer, and delivers it to
//! every attached observer — all under one short critical section, without
//! ever blocking the producer or surfacing an error to it.
//!
//! Attach goes through the same critical section: `subscribe` registers the
//! new observer's channel and snapshots the buffer atomically with respect
//! to publish, so the observer's stream is exactly backfill, then the
//! `connected` marker, then every event published from that instant on —
//! no gaps, no duplicates.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

use super::buffer::ReplayBuffer;
use super::events::{connected_frame, ActivityEvent, EventKind};
use super::registry::{SubscriberId, SubscriberRegistry};

/// Buffer + registry behind one lock, so attach is atomic w.r.t. publish.
struct BusInner {
    buffer: ReplayBuffer,
    registry: SubscriberRegistry,
    closed: bool,
}

/// Process-wide activity broadcaster.
///
/// A cheaply cloneable handle: the monitor lifecycle constructs one and
/// hands clones to producers — there is no module-level instance. All
/// clones share the same buffer and registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    /// Create a bus whose replay buffer holds `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                buffer: ReplayBuffer::new(capacity),
                registry: SubscriberRegistry::new(),
                closed: false,
            })),
        }
    }

    /// Publish one activity event. Fire-and-forget: never blocks on
    /// observer I/O, never fails, regardless of how many observers are
    /// attached (including none).
    pub fn emit(
        &self,
        group: impl Into<String>,
        kind: EventKind,
        subtype: impl Into<String>,
        summary: impl Into<String>,
    ) {
        self.publish(ActivityEvent::new(group, kind, subtype, summary).to_line());
    }

    /// Publish an already-serialized event line.
    pub fn publish(&self, line: Arc<str>) {
        let mut inner = self.lock();
        inner.buffer.append(Arc::clone(&line));
        if inner.registry.is_empty() {
            return;
        }
        let dead = inner.registry.broadcast(&line);
        for id in dead {
            inner.registry.remove(id);
        }
    }

    /// Attach a new observer.
    ///
    /// Registration and the buffer snapshot happen inside the same critical
    /// section that serializes [`publish`](Self::publish): an event
    /// published concurrently with attach lands either in the backfill or
    /// in the live channel, never both, never neither. The returned
    /// [`Subscription`] yields the backfill (ending with the `connected`
    /// marker) and then live events; dropping it detaches the observer.
    ///
    /// After [`close`](Self::close), subscriptions come back already
    /// terminated so a racing attach cannot outlive shutdown.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if inner.closed {
            drop(tx);
            return Subscription {
                id: None,
                backfill: VecDeque::new(),
                rx,
                bus: self.clone(),
            };
        }
        let id = inner.registry.add(tx);
        let mut backfill: VecDeque<Arc<str>> = inner.buffer.snapshot().into();
        backfill.push_back(connected_frame());
        Subscription {
            id: Some(id),
            backfill,
            rx,
            bus: self.clone(),
        }
    }

    /// Detach one observer. Idempotent.
    pub fn detach(&self, id: SubscriberId) {
        self.lock().registry.remove(id);
    }

    /// Close the bus: drop every observer channel (ending every stream) and
    /// refuse new attaches. Publishing remains total — events still land in
    /// the buffer, they just have nowhere to go.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.registry.clear();
        debug!("event bus closed");
    }

    /// Number of currently attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().registry.len()
    }

    /// Number of events currently held for replay.
    pub fn buffered(&self) -> usize {
        self.lock().buffer.len()
    }

    // Publish must stay total even if another thread panicked while holding
    // the lock: recover the guard from a poisoned mutex.
    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One observer's view of the bus: backfill first, then live events.
///
/// Implements [`Stream`]. Detaches itself from the registry on drop — on
/// every exit route (client disconnect, write failure, shutdown), so no
/// registry entry outlives its connection.
pub struct Subscription {
    id: Option<SubscriberId>,
    backfill: VecDeque<Arc<str>>,
    rx: mpsc::UnboundedReceiver<Arc<str>>,
    bus: EventBus,
}

impl Subscription {
    /// Registry id, if this subscription was attached before shutdown.
    pub fn id(&self) -> Option<SubscriberId> {
        self.id
    }
}

impl Stream for Subscription {
    type Item = Arc<str>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(line) = this.backfill.pop_front() {
            return Poll::Ready(Some(line));
        }
        this.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.bus.detach(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    fn emit(bus: &EventBus, summary: &str) {
        bus.emit("group-a", EventKind::Agent, "text", summary);
    }

    /// Pull the next line off a subscription, panicking if none arrives.
    async fn next_line(sub: &mut Subscription) -> String {
        tokio::time::timeout(std::time::Duration::from_secs(1), sub.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended unexpectedly")
            .to_string()
    }

    fn summary_of(line: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        value["summary"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_backfill_then_connected_then_live() {
        let bus = EventBus::new(3);
        for s in ["A", "B", "C", "D"] {
            emit(&bus, s);
        }
        // capacity 3: A evicted
        let mut sub = bus.subscribe();
        assert_eq!(summary_of(&next_line(&mut sub).await), "B");
        assert_eq!(summary_of(&next_line(&mut sub).await), "C");
        assert_eq!(summary_of(&next_line(&mut sub).await), "D");
        assert_eq!(next_line(&mut sub).await, r#"{"type":"connected"}"#);

        emit(&bus, "E");
        assert_eq!(summary_of(&next_line(&mut sub).await), "E");
        assert_eq!(bus.buffered(), 3);
    }

    #[tokio::test]
    async fn test_attach_to_empty_buffer() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();
        assert_eq!(next_line(&mut sub).await, r#"{"type":"connected"}"#);
    }

    #[tokio::test]
    async fn test_overlapping_subscribers_see_same_order() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        emit(&bus, "one");
        let mut second = bus.subscribe();
        emit(&bus, "two");
        emit(&bus, "three");

        let mut seen_first = Vec::new();
        for _ in 0..4 {
            seen_first.push(next_line(&mut first).await);
        }
        let mut seen_second = Vec::new();
        for _ in 0..4 {
            seen_second.push(next_line(&mut second).await);
        }

        // first: connected, one, two, three; second: one (backfill), connected, two, three
        assert_eq!(summary_of(&seen_first[1]), "one");
        assert_eq!(summary_of(&seen_second[0]), "one");
        // events published while both were attached arrive in the same relative order
        assert_eq!(
            seen_first[2..].iter().map(|l| summary_of(l)).collect::<Vec<_>>(),
            seen_second[2..].iter().map(|l| summary_of(l)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_detach_does_not_affect_others() {
        let bus = EventBus::new(10);
        let kept = bus.subscribe();
        let dropped = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(dropped);
        assert_eq!(bus.subscriber_count(), 1);

        emit(&bus, "after-detach");
        let mut kept = kept;
        assert_eq!(next_line(&mut kept).await, r#"{"type":"connected"}"#);
        assert_eq!(summary_of(&next_line(&mut kept).await), "after-detach");
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_only_buffers() {
        let bus = EventBus::new(3);
        for i in 0..10 {
            emit(&bus, &format!("e{i}"));
        }
        assert_eq!(bus.buffered(), 3);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_pruned_on_publish() {
        let bus = EventBus::new(10);
        // a transport that went away without a clean detach: receiver gone,
        // registry entry still present
        let (tx, rx) = mpsc::unbounded_channel();
        bus.lock().registry.add(tx);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 1);

        emit(&bus, "x");
        // the send failed, the entry was pruned, and publish stayed total
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.buffered(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_after_close_terminates_immediately() {
        let bus = EventBus::new(10);
        emit(&bus, "early");
        bus.close();
        let mut sub = bus.subscribe();
        assert!(sub.id().is_none());
        assert_eq!(sub.next().await, None);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_open_subscriptions() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();
        assert_eq!(next_line(&mut sub).await, r#"{"type":"connected"}"#);
        bus.close();
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_emit_is_usable_across_threads() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();
        assert_eq!(next_line(&mut sub).await, r#"{"type":"connected"}"#);

        let mut handles = Vec::new();
        for t in 0..4 {
            let bus = bus.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..10 {
                    bus.emit("g", EventKind::Agent, "text", format!("{t}-{i}"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        for _ in 0..40 {
            seen.insert(summary_of(&next_line(&mut sub).await));
        }
        assert_eq!(seen.len(), 40);
        assert_eq!(bus.buffered(), 40);
    }
}
