use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::AtomicU64;

/// One cell of a ring's fixed backing array.
///
/// The `seq` ticket is the single source of truth for the slot's lifecycle.
/// For the slot claimed at logical index `i` with ring capacity `C`:
///
/// - `seq == i`     : empty for this generation, a producer may claim it
/// - `seq == i + 1` : written, a consumer may claim it; payload initialized
/// - `seq == i + C` : empty again, for the next use of the same cell
///
/// Transitions are release stores paired with acquire loads, so the
/// producer's payload write happens-before the consumer's payload read.
/// The payload is valid exactly while the ticket is in the written state.
///
/// Aligned to a cache line so neighbouring slots do not false-share.
#[repr(C, align(64))]
pub(crate) struct Slot<T> {
    pub(crate) seq: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new(ticket: u64) -> Self {
        Self {
            seq: AtomicU64::new(ticket),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Initializes the payload.
    ///
    /// # Safety
    ///
    /// The caller must hold the claim on this slot (it advanced the counter
    /// past this index) and the slot must be vacant for its generation.
    #[inline]
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.value.get()).write(value);
    }

    /// Moves the payload out, leaving the slot vacant.
    ///
    /// # Safety
    ///
    /// The caller must hold the claim on this slot and the payload must be
    /// initialized (ticket in the written state when the claim was taken).
    #[inline]
    pub(crate) unsafe fn read(&self) -> T {
        (*self.value.get()).assume_init_read()
    }

    /// Drops the payload in place. Used only during ring teardown.
    ///
    /// # Safety
    ///
    /// Requires exclusive access to the ring and an initialized payload.
    pub(crate) unsafe fn drop_payload(&self) {
        ptr::drop_in_place((*self.value.get()).as_mut_ptr());
    }
}

// Safety: slot handoff is synchronized by the `seq` ticket; a slot's payload
// is only ever touched by the thread whose claim the ticket reflects. T must
// be Send because payloads cross threads by value.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

/// Builds the slot array with each ticket set to its own index (generation
/// zero, empty). A boxed slice rather than a `Vec` since the size is fixed
/// at construction and the allocation is never moved.
pub(crate) fn slot_array<T>(capacity: usize) -> Box<[Slot<T>]> {
    let mut slots = Vec::with_capacity(capacity);
    for i in 0..capacity {
        slots.push(Slot::new(i as u64));
    }
    slots.into_boxed_slice()
}

/// Pads its contents out to 128 bytes. One cache line is not enough on
/// recent x86 parts, whose prefetchers pull adjacent line pairs and so can
/// still induce false sharing across a 64-byte boundary.
#[repr(align(128))]
pub(crate) struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_slot_alignment() {
        assert!(mem::align_of::<Slot<u8>>() >= 64);
        assert!(mem::align_of::<CacheAligned<AtomicU64>>() >= 128);
    }

    #[test]
    fn test_slot_array_tickets() {
        let slots = slot_array::<u32>(8);
        for (i, slot) in slots.iter().enumerate() {
            assert_eq!(slot.seq.load(Ordering::Relaxed), i as u64);
        }
    }

    #[test]
    fn test_write_read_round_trip() {
        let slot = Slot::<String>::new(0);
        unsafe {
            slot.write("hello".to_string());
            assert_eq!(slot.read(), "hello");
        }
    }
}
