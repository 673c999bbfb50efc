//! Bounded replay buffer for serialized events
//!
//! Holds the most recent N serialized events so a newly attached observer
//! can be backfilled before receiving live traffic. Strict FIFO: append at
//! the tail, evict from the head when full. Pure bookkeeping — no locking
//! here; the owning bus serializes access.

use std::collections::VecDeque;
use std::sync::Arc;

/// Fixed-capacity FIFO log of serialized events.
#[derive(Debug)]
pub struct ReplayBuffer {
    events: VecDeque<Arc<str>>,
    capacity: usize,
}

impl ReplayBuffer {
    /// Create a buffer. Capacity is fixed for the buffer's lifetime.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one serialized event, evicting from the head when full.
    pub fn append(&mut self, line: Arc<str>) {
        self.events.push_back(line);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    /// Owned copy of the current contents, oldest first.
    ///
    /// Lines are `Arc<str>`, so this clones pointers, not bytes. The copy is
    /// safe to iterate while further appends occur.
    pub fn snapshot(&self) -> Vec<Arc<str>> {
        self.events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    fn contents(buffer: &ReplayBuffer) -> Vec<String> {
        buffer.snapshot().iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut buffer = ReplayBuffer::new(3);
        for s in ["A", "B", "C", "D"] {
            buffer.append(line(s));
        }
        assert_eq!(contents(&buffer), ["B", "C", "D"]);

        buffer.append(line("E"));
        assert_eq!(contents(&buffer), ["C", "D", "E"]);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut buffer = ReplayBuffer::new(5);
        for i in 0..100 {
            buffer.append(line(&i.to_string()));
            assert!(buffer.len() <= 5);
        }
        assert_eq!(contents(&buffer), ["95", "96", "97", "98", "99"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut buffer = ReplayBuffer::new(3);
        buffer.append(line("A"));
        let snap = buffer.snapshot();
        buffer.append(line("B"));
        assert_eq!(snap.len(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = ReplayBuffer::new(3);
        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_empty());
        assert_eq!(buffer.capacity(), 3);
    }
}
