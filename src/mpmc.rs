//! Multi-producer multi-consumer ring with ticketed slots.
//!
//! Producers race on `tail` and consumers race on `head`; a thread claims a
//! logical index by winning a compare-and-swap (or a `fetch_add` block
//! reservation) and from then on owns the slot exclusively until it
//! publishes the next ticket value. The ticket encodes the generation, so a
//! thread that stalls across a full wrap of the ring can never mistake a
//! recycled slot for its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::invariants::{debug_assert_slot_readable, debug_assert_slot_writable};
use crate::slot::{slot_array, CacheAligned, Slot};
use crate::{Backoff, Config, DequeueError, EnqueueError, Metrics, MetricsSnapshot};

/// Bounded lock-free MPMC queue.
///
/// All operations take `&self`; share the ring between threads with an
/// `Arc` (or scoped borrows). Single-item operations are lock-free: a failed
/// claim always means some other thread succeeded.
///
/// The two batch operations are deliberately asymmetric. [`enqueue_many`]
/// reserves its block up front with one `fetch_add` and then waits for each
/// reserved slot to drain, which maximizes producer throughput but commits
/// the producer irrevocably - it assumes consumers keep running.
/// [`dequeue_many`] never reserves: it claims only the contiguous run of
/// already-published slots, so at end-of-stream consumers drain what exists
/// and return instead of waiting on items that will never arrive. Do not
/// symmetrize them.
///
/// [`enqueue_many`]: MpmcRing::enqueue_many
/// [`dequeue_many`]: MpmcRing::dequeue_many
pub struct MpmcRing<T> {
    head: CacheAligned<AtomicU64>,
    tail: CacheAligned<AtomicU64>,

    metrics: Metrics,
    config: Config,
    slots: Box<[Slot<T>]>,
}

impl<T> MpmcRing<T> {
    /// Creates a ring from a configuration.
    pub fn new(config: Config) -> Self {
        Self {
            head: CacheAligned::new(AtomicU64::new(0)),
            tail: CacheAligned::new(AtomicU64::new(0)),
            metrics: Metrics::new(),
            config,
            slots: slot_array(config.capacity()),
        }
    }

    /// Creates a ring with the given capacity (rounded up to a power of
    /// two, minimum 2) and metrics disabled.
    pub fn with_capacity(requested_capacity: usize) -> Self {
        Self::new(Config::with_capacity(requested_capacity))
    }

    /// The fixed (power-of-two) capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    fn slot(&self, idx: u64) -> &Slot<T> {
        &self.slots[(idx as usize) & self.config.mask()]
    }

    /// Approximate occupancy from relaxed counter loads.
    ///
    /// Advisory only: under concurrent mutation the snapshot can run ahead
    /// of or behind any consistent instant, and may transiently exceed
    /// `capacity()` while a batch reservation is being published. Use for
    /// diagnostics or coarse pacing, never for correctness.
    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    /// True if the ring appears empty. As approximate as [`MpmcRing::len`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the ring's counters if metrics are enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Attempts to enqueue without blocking.
    ///
    /// Fails with [`EnqueueError::Full`] when the slot for the current tail
    /// generation has not been drained, handing the value back untouched.
    pub fn try_enqueue(&self, value: T) -> Result<(), EnqueueError<T>> {
        let mut pos = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            let seq = slot.seq.load(Ordering::Acquire);
            // Signed distance between the ticket and the index we want.
            let diff = seq.wrapping_sub(pos) as i64;

            if diff == 0 {
                // Vacant for our generation: race for the index.
                match self.tail.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // We own the slot until the release store below.
                        unsafe { slot.write(value) };
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        if self.config.enable_metrics {
                            self.metrics.add_enqueued(1);
                        }
                        return Ok(());
                    }
                    // Lost the race; the CAS already refreshed pos.
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // The previous generation has not been consumed yet.
                return Err(EnqueueError::Full(value));
            } else {
                // Another producer moved past this index.
                pos = self.tail.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to dequeue without blocking.
    ///
    /// Fails with [`DequeueError::Empty`] when no published item is waiting
    /// at the current head.
    pub fn try_dequeue(&self) -> Result<T, DequeueError> {
        let mut pos = self.head.load(Ordering::Relaxed);
        loop {
            let slot = self.slot(pos);
            let seq = slot.seq.load(Ordering::Acquire);
            // A published slot carries index + 1.
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as i64;

            if diff == 0 {
                match self.head.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { slot.read() };
                        // Free the cell for its next generation.
                        slot.seq.store(
                            pos.wrapping_add(self.capacity() as u64),
                            Ordering::Release,
                        );
                        if self.config.enable_metrics {
                            self.metrics.add_dequeued(1);
                        }
                        return Ok(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                return Err(DequeueError::Empty);
            } else {
                pos = self.head.load(Ordering::Relaxed);
            }
        }
    }

    /// Enqueues a block of up to `capacity()` items with a single counter
    /// reservation, returning how many were taken from `items`.
    ///
    /// One `fetch_add` on `tail` reserves the whole (clamped) block; the
    /// reservation is irrevocable, so the call then waits - spinning
    /// briefly, then yielding - for each reserved slot to be drained by
    /// consumers before publishing into it. The return value is always
    /// `min(items.len(), capacity())`; a partial count only ever reflects
    /// that clamp.
    ///
    /// If every consumer stops permanently while a reservation is pending,
    /// this call spins forever. The queue assumes a live consumer side;
    /// shutdown ordering is the caller's responsibility. Callers needing
    /// bounded latency should size batches against the drain rate or use
    /// [`MpmcRing::try_enqueue`].
    pub fn enqueue_many(&self, items: &[T]) -> usize
    where
        T: Clone,
    {
        if items.is_empty() {
            return 0;
        }
        let want = items.len().min(self.capacity());
        let start = self.tail.fetch_add(want as u64, Ordering::AcqRel);
        let mut waits = 0u64;

        for (i, item) in items[..want].iter().enumerate() {
            let idx = start.wrapping_add(i as u64);
            let slot = self.slot(idx);

            // Wait for the previous generation to drain out of our slot.
            let mut backoff = Backoff::new();
            while slot.seq.load(Ordering::Acquire) != idx {
                backoff.snooze();
                waits += 1;
            }
            debug_assert_slot_writable!(slot.seq.load(Ordering::Relaxed), idx);

            unsafe { slot.write(item.clone()) };
            slot.seq.store(idx.wrapping_add(1), Ordering::Release);
        }

        if self.config.enable_metrics {
            self.metrics.add_enqueued(want as u64);
            self.metrics.add_batch_enqueued();
            self.metrics.add_claim_spins(waits);
        }
        want
    }

    /// Dequeues up to `max` items into `out` (appending), returning how
    /// many were taken. Never blocks; returns 0 when nothing is ready.
    ///
    /// Claims only the contiguous run of published slots starting at the
    /// current head: snapshot `head`, scan forward while tickets read
    /// "written", then CAS the whole run in one step. A failed CAS means
    /// another consumer advanced `head`; the scan restarts from a fresh
    /// snapshot.
    pub fn dequeue_many(&self, out: &mut Vec<T>, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        let want = max.min(self.capacity());

        loop {
            let start = self.head.load(Ordering::Relaxed);

            // Length of the contiguous ready prefix at the snapshot.
            let mut ready = 0usize;
            while ready < want {
                let idx = start.wrapping_add(ready as u64);
                if self.slot(idx).seq.load(Ordering::Acquire) != idx.wrapping_add(1) {
                    break;
                }
                ready += 1;
            }

            if ready == 0 {
                return 0;
            }

            if self
                .head
                .compare_exchange_weak(
                    start,
                    start.wrapping_add(ready as u64),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_err()
            {
                // Another consumer claimed part of the run; rescan.
                continue;
            }

            // The run [start, start + ready) is exclusively ours.
            out.reserve(ready);
            for i in 0..ready {
                let idx = start.wrapping_add(i as u64);
                let slot = self.slot(idx);
                debug_assert_slot_readable!(slot.seq.load(Ordering::Relaxed), idx);

                let value = unsafe { slot.read() };
                slot.seq.store(
                    idx.wrapping_add(self.capacity() as u64),
                    Ordering::Release,
                );
                out.push(value);
            }

            if self.config.enable_metrics {
                self.metrics.add_dequeued(ready as u64);
                self.metrics.add_batch_dequeued();
            }
            return ready;
        }
    }

    /// Enqueues with a deadline, polling [`MpmcRing::try_enqueue`] under
    /// adaptive backoff. Returns [`EnqueueError::Timeout`] with the value
    /// once `deadline` has passed without a free slot.
    pub fn enqueue_until(&self, value: T, deadline: Instant) -> Result<(), EnqueueError<T>> {
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

    /// Dequeues with a deadline, polling [`MpmcRing::try_dequeue`] under
    /// adaptive backoff. Returns [`DequeueError::Timeout`] once `deadline`
    /// has passed with no item available.
    pub fn dequeue_until(&self, deadline: Instant) -> Result<T, DequeueError> {
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
}

impl<T> Drop for MpmcRing<T> {
    fn drop(&mut self) {
        // Exclusive access, no operation in flight: every index in
        // [head, tail) holds a published payload.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);

        let mut pos = head;
        while pos != tail {
            unsafe { self.slot(pos).drop_payload() };
            pos = pos.wrapping_add(1);
        }
    }
}
