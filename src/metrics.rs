use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe operation counters.
///
/// Everything here is statistical, so the counters use `Relaxed` ordering
/// throughout: no control flow depends on an exact value and readers only
/// need eventual visibility.
#[derive(Debug, Default)]
pub struct Metrics {
    items_enqueued: AtomicU64,
    items_dequeued: AtomicU64,
    batches_enqueued: AtomicU64,
    batches_dequeued: AtomicU64,
    claim_spins: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_enqueued(&self, n: u64) {
        self.items_enqueued.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_dequeued(&self, n: u64) {
        self.items_dequeued.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_batch_enqueued(&self) {
        self.batches_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_batch_dequeued(&self) {
        self.batches_dequeued.fetch_add(1, Ordering::Relaxed);
    }

    /// Count of backoff rounds spent waiting for a reserved slot to drain.
    #[inline]
    pub(crate) fn add_claim_spins(&self, n: u64) {
        self.claim_spins.fetch_add(n, Ordering::Relaxed);
    }

    /// Take a snapshot of current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_enqueued: self.items_enqueued.load(Ordering::Relaxed),
            items_dequeued: self.items_dequeued.load(Ordering::Relaxed),
            batches_enqueued: self.batches_enqueued.load(Ordering::Relaxed),
            batches_dequeued: self.batches_dequeued.load(Ordering::Relaxed),
            claim_spins: self.claim_spins.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of metrics values.
///
/// Plain data (Copy, Clone) for easy aggregation and display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub items_enqueued: u64,
    pub items_dequeued: u64,
    pub batches_enqueued: u64,
    pub batches_dequeued: u64,
    pub claim_spins: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let m = Metrics::new();
        m.add_enqueued(3);
        m.add_dequeued(2);
        m.add_batch_enqueued();
        m.add_claim_spins(5);

        let snap = m.snapshot();
        assert_eq!(snap.items_enqueued, 3);
        assert_eq!(snap.items_dequeued, 2);
        assert_eq!(snap.batches_enqueued, 1);
        assert_eq!(snap.batches_dequeued, 0);
        assert_eq!(snap.claim_spins, 5);
    }
}
