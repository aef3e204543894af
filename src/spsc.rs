//! Single-producer single-consumer ring with ticketed slots.
//!
//! With exactly one thread on each side, the counters need no cross-thread
//! claim protocol: `tail` is written only by the producer and `head` only by
//! the consumer, both with relaxed stores. All payload synchronization runs
//! through the slot tickets:
//!
//! **Producer:**
//! 1. Load `tail` with Relaxed (only the producer writes tail)
//! 2. Acquire-load the slot ticket; `seq != tail` means full
//! 3. Write the payload (exclusive: the ticket gates the consumer out)
//! 4. Release-store `seq = tail + 1` (publishes the payload)
//! 5. Relaxed-store `tail + 1`
//!
//! **Consumer:**
//! 1. Load `head` with Relaxed (only the consumer writes head)
//! 2. Acquire-load the slot ticket; `seq != head + 1` means empty
//! 3. Move the payload out
//! 4. Release-store `seq = head + capacity` (frees the cell for the next
//!    generation)
//! 5. Relaxed-store `head + 1`
//!
//! The acquire load in step 2 synchronizes with the opposite role's release
//! store, so the payload write always happens-before the payload read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::invariants::{debug_assert_bounded_count, debug_assert_head_not_past_tail};
use crate::slot::{slot_array, CacheAligned, Slot};
use crate::{Backoff, Config, DequeueError, EnqueueError, Metrics, MetricsSnapshot};

/// Shared core of one SPSC ring. Owned jointly by the two handles.
struct Inner<T> {
    // Counters on their own 128-byte lines so the producer's tail writes do
    // not evict the consumer's head line and vice versa.
    head: CacheAligned<AtomicU64>,
    tail: CacheAligned<AtomicU64>,

    metrics: Metrics,
    config: Config,
    slots: Box<[Slot<T>]>,
}

impl<T> Inner<T> {
    fn new(config: Config) -> Self {
        Self {
            head: CacheAligned::new(AtomicU64::new(0)),
            tail: CacheAligned::new(AtomicU64::new(0)),
            metrics: Metrics::new(),
            config,
            slots: slot_array(config.capacity()),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    fn slot(&self, idx: u64) -> &Slot<T> {
        &self.slots[(idx as usize) & self.config.mask()]
    }

    #[inline]
    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Exclusive access: every index in [head, tail) holds a published
        // payload once both handles are gone.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);

        let mut pos = head;
        while pos != tail {
            unsafe { self.slot(pos).drop_payload() };
            pos = pos.wrapping_add(1);
        }
    }
}

/// Creates a connected producer/consumer pair over a fresh ring.
///
/// The handles are `Send` but not clonable, and every mutating operation
/// takes `&mut self`, so the one-producer/one-consumer discipline holds by
/// construction. Dropping both handles destroys the ring and any payloads
/// still in it; drain first if destruction order matters.
pub fn channel<T>(config: Config) -> (Producer<T>, Consumer<T>) {
    let ring = Arc::new(Inner::new(config));
    (
        Producer {
            ring: Arc::clone(&ring),
        },
        Consumer { ring },
    )
}

/// Sending half of an SPSC ring.
pub struct Producer<T> {
    ring: Arc<Inner<T>>,
}

// Note: Producer and Consumer intentionally do NOT implement Clone.
// A second handle on either side would break the single-writer discipline
// on its counter, which is what lets the counters use plain relaxed stores.

impl<T> Producer<T> {
    /// Attempts to enqueue without blocking.
    ///
    /// Fails with [`EnqueueError::Full`] when the slot at the current tail
    /// has not been drained yet, handing the value back untouched.
    pub fn try_enqueue(&mut self, value: T) -> Result<(), EnqueueError<T>> {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);
        let slot = ring.slot(tail);

        if slot.seq.load(Ordering::Acquire) != tail {
            return Err(EnqueueError::Full(value));
        }

        // The ticket matches our generation: the cell is vacant and the
        // consumer cannot touch it until the release store below.
        unsafe { slot.write(value) };
        slot.seq.store(tail.wrapping_add(1), Ordering::Release);
        ring.tail.store(tail.wrapping_add(1), Ordering::Relaxed);

        debug_assert_bounded_count!(
            tail.wrapping_add(1)
                .wrapping_sub(ring.head.load(Ordering::Relaxed)) as usize,
            ring.capacity()
        );

        if ring.config.enable_metrics {
            ring.metrics.add_enqueued(1);
        }
        Ok(())
    }

    /// Enqueues with a deadline, polling [`Self::try_enqueue`] under
    /// adaptive backoff: spin briefly with PAUSE hints, yield, repeat.
    ///
    /// Returns [`EnqueueError::Timeout`] with the value once `deadline` has
    /// passed without a free slot.
    pub fn enqueue_until(
        &mut self,
        value: T,
        deadline: Instant,
    ) -> Result<(), EnqueueError<T>> {
        let mut value = value;
        let mut backoff = Backoff::new();
        loop {
            match self.try_enqueue(value) {
                Ok(()) => return Ok(()),
                Err(EnqueueError::Full(v)) | Err(EnqueueError::Timeout(v)) => value = v,
            }
            if Instant::now() >= deadline {
                return Err(EnqueueError::Timeout(value));
            }
            backoff.snooze();
            if backoff.is_completed() {
                backoff.reset();
            }
        }
    }

    /// Approximate number of items currently queued. Advisory only.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// True if no items appear to be queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed (power-of-two) capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Snapshot of the ring's counters if metrics are enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ring.metrics.snapshot()
    }
}

/// Receiving half of an SPSC ring.
pub struct Consumer<T> {
    ring: Arc<Inner<T>>,
}

impl<T> Consumer<T> {
    /// Attempts to dequeue without blocking.
    ///
    /// Fails with [`DequeueError::Empty`] when the slot at the current head
    /// has not been written for this generation.
    pub fn try_dequeue(&mut self) -> Result<T, DequeueError> {
        let ring = &*self.ring;
        let head = ring.head.load(Ordering::Relaxed);
        let slot = ring.slot(head);

        if slot.seq.load(Ordering::Acquire) != head.wrapping_add(1) {
            return Err(DequeueError::Empty);
        }

        let value = unsafe { slot.read() };
        // Free the cell for its next generation.
        slot.seq
            .store(head.wrapping_add(ring.capacity() as u64), Ordering::Release);
        ring.head.store(head.wrapping_add(1), Ordering::Relaxed);

        debug_assert_head_not_past_tail!(
            head.wrapping_add(1),
            ring.tail.load(Ordering::Relaxed)
        );

        if ring.config.enable_metrics {
            ring.metrics.add_dequeued(1);
        }
        Ok(value)
    }

    /// Dequeues with a deadline, polling [`Self::try_dequeue`] under
    /// adaptive backoff.
    ///
    /// Returns [`DequeueError::Timeout`] once `deadline` has passed with no
    /// item available.
    pub fn dequeue_until(&mut self, deadline: Instant) -> Result<T, DequeueError> {
        let mut backoff = Backoff::new();
        loop {
            if let Ok(value) = self.try_dequeue() {
                return Ok(value);
            }
            if Instant::now() >= deadline {
                return Err(DequeueError::Timeout);
            }
            backoff.snooze();
            if backoff.is_completed() {
                backoff.reset();
            }
        }
    }

    /// Approximate number of items currently queued. Advisory only.
    #[inline]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// True if no items appear to be queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The fixed (power-of-two) capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Snapshot of the ring's counters if metrics are enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ring.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_round_trip_single_item() {
        let (mut tx, mut rx) = channel::<u32>(Config::with_capacity(4));
        tx.try_enqueue(42).unwrap();
        assert_eq!(rx.try_dequeue().unwrap(), 42);
        assert_eq!(rx.try_dequeue(), Err(DequeueError::Empty));
    }

    #[test]
    fn test_empty_full_boundaries() {
        let (mut tx, mut rx) = channel::<u32>(Config::with_capacity(4));

        assert_eq!(rx.try_dequeue(), Err(DequeueError::Empty));

        for v in [10, 20, 30, 40] {
            tx.try_enqueue(v).unwrap();
        }
        assert_eq!(tx.try_enqueue(50), Err(EnqueueError::Full(50)));

        assert_eq!(rx.try_dequeue().unwrap(), 10);
        tx.try_enqueue(50).unwrap();

        for expected in [20, 30, 40, 50] {
            assert_eq!(rx.try_dequeue().unwrap(), expected);
        }
        assert_eq!(rx.try_dequeue(), Err(DequeueError::Empty));
    }

    #[test]
    fn test_wrap_around_many_generations() {
        // Capacity 2 forces a slot reuse every other item.
        let (mut tx, mut rx) = channel::<u64>(Config::with_capacity(2));
        for i in 0..10_000u64 {
            tx.try_enqueue(i).unwrap();
            assert_eq!(rx.try_dequeue().unwrap(), i);
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_len_tracks_occupancy() {
        let (mut tx, mut rx) = channel::<u8>(Config::with_capacity(8));
        assert_eq!(tx.len(), 0);
        tx.try_enqueue(1).unwrap();
        tx.try_enqueue(2).unwrap();
        assert_eq!(tx.len(), 2);
        assert_eq!(rx.len(), 2);
        rx.try_dequeue().unwrap();
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_metrics_when_enabled() {
        let (mut tx, mut rx) = channel::<u8>(Config::new(8, true));
        tx.try_enqueue(1).unwrap();
        tx.try_enqueue(2).unwrap();
        rx.try_dequeue().unwrap();

        let snap = rx.metrics();
        assert_eq!(snap.items_enqueued, 2);
        assert_eq!(snap.items_dequeued, 1);
    }

    #[test]
    fn test_drop_releases_queued_payloads() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Debug)]
        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let (mut tx, rx) = channel::<Tracked>(Config::with_capacity(4));
        tx.try_enqueue(Tracked).unwrap();
        tx.try_enqueue(Tracked).unwrap();
        tx.try_enqueue(Tracked).unwrap();

        drop(tx);
        drop(rx);
        assert_eq!(DROPS.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_deadline_enqueue_returns_value() {
        let (mut tx, _rx) = channel::<u32>(Config::with_capacity(2));
        tx.try_enqueue(1).unwrap();
        tx.try_enqueue(2).unwrap();

        let deadline = Instant::now() + std::time::Duration::from_millis(5);
        assert_eq!(
            tx.enqueue_until(3, deadline),
            Err(EnqueueError::Timeout(3))
        );
    }
}
