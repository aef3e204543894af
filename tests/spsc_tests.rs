//! Cross-thread scenarios for the SPSC ring.

use ringmpmc_rs::{spsc, Backoff, Config, DequeueError, EnqueueError};
use std::thread;
use std::time::{Duration, Instant};

/// Retries an enqueue until it lands, backing off between attempts.
fn enqueue_spin<T>(tx: &mut spsc::Producer<T>, mut value: T) {
    let mut backoff = Backoff::new();
    loop {
        match tx.try_enqueue(value) {
            Ok(()) => return,
            Err(EnqueueError::Full(v)) | Err(EnqueueError::Timeout(v)) => value = v,
        }
        backoff.snooze();
        if backoff.is_completed() {
            backoff.reset();
        }
    }
}

fn dequeue_spin<T>(rx: &mut spsc::Consumer<T>) -> T {
    let mut backoff = Backoff::new();
    loop {
        if let Ok(value) = rx.try_dequeue() {
            return value;
        }
        backoff.snooze();
        if backoff.is_completed() {
            backoff.reset();
        }
    }
}

/// Capacity 2 recycles every slot 500 000 times; any generation confusion
/// would surface as a reordered or duplicated value.
#[test]
fn test_wrap_around_stress_capacity_2() {
    const ITEMS: u64 = 1_000_000;

    let (mut tx, mut rx) = spsc::channel::<u64>(Config::with_capacity(2));

    let producer = thread::spawn(move || {
        for i in 0..ITEMS {
            enqueue_spin(&mut tx, i);
        }
    });

    for expected in 0..ITEMS {
        assert_eq!(dequeue_spin(&mut rx), expected);
    }
    assert!(rx.is_empty());

    producer.join().unwrap();
}

#[test]
fn test_fifo_order_across_threads() {
    const ITEMS: u64 = 100_000;

    let (mut tx, mut rx) = spsc::channel::<u64>(Config::with_capacity(128));

    let producer = thread::spawn(move || {
        for i in 0..ITEMS {
            enqueue_spin(&mut tx, i);
        }
    });

    let mut next = 0u64;
    while next < ITEMS {
        let got = dequeue_spin(&mut rx);
        assert_eq!(got, next);
        next += 1;
    }

    producer.join().unwrap();
    assert_eq!(rx.try_dequeue(), Err(DequeueError::Empty));
}

#[test]
fn test_dequeue_until_respects_deadline() {
    let (_tx, mut rx) = spsc::channel::<u64>(Config::with_capacity(4));

    let wait = Duration::from_millis(10);
    let started = Instant::now();
    let result = rx.dequeue_until(started + wait);
    let elapsed = started.elapsed();

    assert_eq!(result, Err(DequeueError::Timeout));
    assert!(elapsed >= wait, "returned after {elapsed:?}, before the deadline");
    // Generous slack bound; only guards against a wedged poll loop.
    assert!(elapsed < Duration::from_secs(5));
}

#[test]
fn test_enqueue_until_succeeds_once_drained() {
    let (mut tx, mut rx) = spsc::channel::<u64>(Config::with_capacity(2));
    tx.try_enqueue(1).unwrap();
    tx.try_enqueue(2).unwrap();

    let consumer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(5));
        rx.try_dequeue().unwrap()
    });

    // Full at first, but a slot opens well inside the deadline.
    tx.enqueue_until(3, Instant::now() + Duration::from_secs(5))
        .unwrap();

    assert_eq!(consumer.join().unwrap(), 1);
}
