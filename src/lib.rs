//! ringmpmc-rs - Bounded lock-free ring queues with ticketed slots.
//!
//! Two variants share one layout: a fixed, power-of-two-sized circular array
//! of slots, each carrying a monotonically advancing sequence ticket that
//! encodes both the slot's lifecycle (empty / written / read) and its
//! generation, so index wrap-around can never alias an old value.
//!
//! - [`spsc`] - exactly one producer thread and one consumer thread, split
//!   into [`spsc::Producer`] / [`spsc::Consumer`] handles.
//! - [`MpmcRing`] - any number of producer and consumer threads, coordinated
//!   by compare-and-swap claims on the head/tail counters.
//!
//! # Key Features
//!
//! - 128-byte counter alignment (prefetcher false sharing elimination)
//! - Batch enqueue with a single `fetch_add` reservation per block
//! - Non-blocking batch dequeue (contiguous ready run, shutdown-safe)
//! - Deadline-bounded polling wrappers with adaptive backoff
//!
//! # Example
//!
//! ```
//! use ringmpmc_rs::{spsc, Config, MpmcRing};
//!
//! // SPSC: the two roles are separate handles, so the single-producer
//! // single-consumer discipline is enforced at compile time.
//! let (mut tx, mut rx) = spsc::channel::<u64>(Config::with_capacity(8));
//! tx.try_enqueue(7).unwrap();
//! assert_eq!(rx.try_dequeue().unwrap(), 7);
//!
//! // MPMC: one shared object, callable from any number of threads.
//! let ring = MpmcRing::<u64>::with_capacity(8);
//! ring.try_enqueue(1).unwrap();
//! ring.try_enqueue(2).unwrap();
//!
//! let mut out = Vec::new();
//! assert_eq!(ring.dequeue_many(&mut out, 8), 2);
//! assert_eq!(out, vec![1, 2]);
//! ```

mod backoff;
mod config;
mod error;
mod invariants;
mod metrics;
mod mpmc;
mod slot;
pub mod spsc;

pub use backoff::Backoff;
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::{DequeueError, EnqueueError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use mpmc::MpmcRing;
