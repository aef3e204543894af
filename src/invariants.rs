//! Debug assertion macros for the ring invariants.
//!
//! Only active in debug builds, so there is zero overhead in release.
//! Shared by the SPSC and MPMC rings.

/// Assert that occupancy never exceeds capacity.
///
/// Holds at every observable point: `0 <= (tail - head) <= capacity`.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "occupancy {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that head does not advance past tail.
macro_rules! debug_assert_head_not_past_tail {
    ($new_head:expr, $tail:expr) => {
        debug_assert!(
            $new_head <= $tail,
            "advancing head {} beyond tail {}",
            $new_head,
            $tail
        )
    };
}

/// Assert a claimed slot is empty for the claiming producer's generation:
/// its ticket equals the logical index.
macro_rules! debug_assert_slot_writable {
    ($seq:expr, $idx:expr) => {
        debug_assert!(
            $seq == $idx,
            "slot ticket {} not writable at logical index {}",
            $seq,
            $idx
        )
    };
}

/// Assert a claimed slot holds a published payload: its ticket equals the
/// logical index plus one.
macro_rules! debug_assert_slot_readable {
    ($seq:expr, $idx:expr) => {
        debug_assert!(
            $seq == $idx.wrapping_add(1),
            "slot ticket {} not readable at logical index {}",
            $seq,
            $idx
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_slot_readable;
pub(crate) use debug_assert_slot_writable;
