use thiserror::Error;

/// Outcome of a failed enqueue.
///
/// Both cases hand the rejected value back so the caller can retry it or
/// drop it; the ring never takes ownership of a value it did not store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError<T> {
    /// The slot for the current tail generation has not been drained yet.
    #[error("ring is full")]
    Full(T),
    /// The deadline elapsed before a slot became free.
    #[error("deadline elapsed before a slot became free")]
    Timeout(T),
}

impl<T> EnqueueError<T> {
    /// Recovers the value that could not be enqueued.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(v) | Self::Timeout(v) => v,
        }
    }
}

/// Outcome of a failed dequeue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DequeueError {
    /// The slot for the current head generation has not been written yet.
    #[error("ring is empty")]
    Empty,
    /// The deadline elapsed before an item arrived.
    #[error("deadline elapsed before an item arrived")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(EnqueueError::Full(1u8).to_string(), "ring is full");
        assert_eq!(DequeueError::Empty.to_string(), "ring is empty");
    }

    #[test]
    fn test_into_inner() {
        assert_eq!(EnqueueError::Full("x").into_inner(), "x");
        assert_eq!(EnqueueError::Timeout("y").into_inner(), "y");
    }
}
