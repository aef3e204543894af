/// Configuration shared by both ring variants.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Slot count, rounded up to a power of two at construction.
    capacity: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

/// Smallest usable capacity. A one-slot ring degenerates (a slot would be
/// simultaneously the enqueue and dequeue target of every operation), so
/// requests below 2 are raised to 2.
pub const MIN_CAPACITY: usize = 2;

/// Largest accepted capacity request (2^30 slots) to prevent excessive
/// memory usage from a mistyped request.
pub const MAX_CAPACITY: usize = 1 << 30;

impl Config {
    /// Creates a new configuration with the given slot count.
    ///
    /// The capacity is rounded up to the next power of two, with a minimum
    /// of [`MIN_CAPACITY`]. It is fixed for the lifetime of any ring built
    /// from this configuration.
    ///
    /// # Panics
    ///
    /// Panics if `requested_capacity` exceeds [`MAX_CAPACITY`].
    pub const fn new(requested_capacity: usize, enable_metrics: bool) -> Self {
        assert!(
            requested_capacity <= MAX_CAPACITY,
            "requested capacity exceeds 2^30 slots"
        );
        let wanted = if requested_capacity < MIN_CAPACITY {
            MIN_CAPACITY
        } else {
            requested_capacity
        };

        Self {
            capacity: wanted.next_power_of_two(),
            enable_metrics,
        }
    }

    /// Shorthand for [`Config::new`] with metrics disabled.
    pub const fn with_capacity(requested_capacity: usize) -> Self {
        Self::new(requested_capacity, false)
    }

    /// Returns the actual (rounded) capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the mask for converting a sequence number into a slot index.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(1 << 16, false) // 64K slots
    }
}

/// Low latency configuration (4K slots, fits in L1/L2 cache)
pub const LOW_LATENCY_CONFIG: Config = Config::new(1 << 12, false);

/// High throughput configuration (256K slots)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(1 << 18, false);
