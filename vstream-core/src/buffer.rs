//! Bounded frame buffer shared between an I/O pump and a pacing pump.
//!
//! A fixed-capacity FIFO guarded by a mutex held only for the push/pop
//! critical section. Overflow behaviour is chosen per instantiation:
//!
//! - [`OverflowPolicy::DropOldest`] — receive side; favours freshness.
//! - [`OverflowPolicy::RejectNewest`] — capture side; never stalls the
//!   source and never grows memory.
//!
//! `pop` on an empty buffer returns immediately so pacing loops can
//! poll without blocking their other duties.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Default capacity, chosen minimal for lowest latency.
pub const DEFAULT_CAPACITY: usize = 5;

/// What `push` does when the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest element to make room for the new one.
    DropOldest,
    /// Leave the buffer unchanged and discard the new element.
    RejectNewest,
}

/// Result of a single `push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Stored without overflow.
    Stored,
    /// Stored; the oldest element was evicted to make room.
    Evicted,
    /// Buffer was full and the element was discarded.
    Rejected,
}

/// Fixed-capacity FIFO with configurable overflow policy.
#[derive(Debug)]
pub struct FrameBuffer<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl<T> FrameBuffer<T> {
    /// Create a buffer holding at most `capacity` elements.
    ///
    /// A zero capacity is clamped to 1 so `push` always has a defined
    /// meaning.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            policy,
        }
    }

    /// Append an element, applying the overflow policy when full.
    pub fn push(&self, item: T) -> PushOutcome {
        let mut queue = self.inner.lock().expect("frame buffer poisoned");
        if queue.len() < self.capacity {
            queue.push_back(item);
            return PushOutcome::Stored;
        }
        match self.policy {
            OverflowPolicy::DropOldest => {
                queue.pop_front();
                queue.push_back(item);
                PushOutcome::Evicted
            }
            OverflowPolicy::RejectNewest => PushOutcome::Rejected,
        }
    }

    /// Remove and return the oldest element, or `None` immediately if
    /// the buffer is empty.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().expect("frame buffer poisoned").pop_front()
    }

    /// Current number of buffered elements.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("frame buffer poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupancy as a percentage of capacity.
    pub fn fill_percent(&self) -> f64 {
        self.len() as f64 / self.capacity as f64 * 100.0
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let buf = FrameBuffer::new(3, OverflowPolicy::DropOldest);
        buf.push(1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), Some(2));
        assert_eq!(buf.pop(), Some(3));
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn drop_oldest_keeps_most_recent_in_order() {
        let buf = FrameBuffer::new(3, OverflowPolicy::DropOldest);
        for i in 0..4 {
            buf.push(i);
        }
        // capacity + 1 pushes: length stays at capacity, oldest gone.
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), Some(2));
        assert_eq!(buf.pop(), Some(3));
    }

    #[test]
    fn reject_newest_is_a_noop_when_full() {
        let buf = FrameBuffer::new(3, OverflowPolicy::RejectNewest);
        assert_eq!(buf.push(0), PushOutcome::Stored);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.push(99), PushOutcome::Rejected);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.pop(), Some(0));
        assert_eq!(buf.pop(), Some(1));
        assert_eq!(buf.pop(), Some(2));
    }

    #[test]
    fn evicted_outcome_reported() {
        let buf = FrameBuffer::new(1, OverflowPolicy::DropOldest);
        assert_eq!(buf.push(1), PushOutcome::Stored);
        assert_eq!(buf.push(2), PushOutcome::Evicted);
        assert_eq!(buf.pop(), Some(2));
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let buf = FrameBuffer::new(5, OverflowPolicy::DropOldest);
        for i in 0..100 {
            buf.push(i);
            assert!(buf.len() <= buf.capacity());
        }
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn fill_percent() {
        let buf = FrameBuffer::new(4, OverflowPolicy::DropOldest);
        assert_eq!(buf.fill_percent(), 0.0);
        buf.push(1);
        assert_eq!(buf.fill_percent(), 25.0);
        buf.push(2);
        buf.push(3);
        buf.push(4);
        assert_eq!(buf.fill_percent(), 100.0);
    }

    #[test]
    fn zero_capacity_clamped() {
        let buf = FrameBuffer::new(0, OverflowPolicy::RejectNewest);
        assert_eq!(buf.capacity(), 1);
        assert_eq!(buf.push(1), PushOutcome::Stored);
    }

    #[test]
    fn concurrent_push_pop() {
        use std::sync::Arc;

        let buf = Arc::new(FrameBuffer::new(5, OverflowPolicy::DropOldest));
        let producer = {
            let buf = Arc::clone(&buf);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    buf.push(i);
                }
            })
        };
        let consumer = {
            let buf = Arc::clone(&buf);
            std::thread::spawn(move || {
                let mut last = -1i64;
                let mut seen = 0;
                while seen < 100 {
                    if let Some(v) = buf.pop() {
                        // Order is preserved even under eviction.
                        assert!(v as i64 > last);
                        last = v as i64;
                        seen += 1;
                    }
                }
            })
        };
        producer.join().unwrap();
        consumer.join().unwrap();
        assert!(buf.len() <= 5);
    }
}
