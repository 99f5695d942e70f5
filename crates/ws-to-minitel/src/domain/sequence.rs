//! Session-wide numbering of inbound data frames.
//!
//! Every data frame received during the life of the process gets the next
//! number, across reconnects and power-on restarts.  Captures are named after
//! it, so a recorded session replays in order and no file is ever
//! overwritten.
//!
//! # Ownership
//!
//! One counter is created with the session and handed to each relay as an
//! `Arc<FrameCounter>`.  Only the single active relay advances it, but the
//! counter is still atomic so it can be shared between tasks without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing frame sequence numbers, starting at 0.
///
/// # Examples
///
/// ```rust
/// use ws_to_minitel::domain::FrameCounter;
///
/// let counter = FrameCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.issued(), 2);
/// ```
#[derive(Debug, Default)]
pub struct FrameCounter {
    next: AtomicU64,
}

impl FrameCounter {
    /// Creates a counter whose first number is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next sequence number and advances the counter.
    ///
    /// `Ordering::Relaxed` is enough: the number only names a frame, it does
    /// not publish any other memory.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of sequence numbers handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counter_starts_at_zero() {
        // Arrange
        let counter = FrameCounter::new();

        // Act
        let first = counter.next();

        // Assert
        assert_eq!(first, 0);
    }

    #[test]
    fn test_counter_increments_by_exactly_one() {
        let counter = FrameCounter::new();

        let values: Vec<u64> = (0..100).map(|_| counter.next()).collect();

        assert_eq!(values, (0..100).collect::<Vec<u64>>());
    }

    #[test]
    fn test_issued_does_not_advance() {
        let counter = FrameCounter::new();
        counter.next();

        assert_eq!(counter.issued(), 1);
        assert_eq!(counter.issued(), 1);
        assert_eq!(counter.next(), 1);
    }

    #[test]
    fn test_shared_counter_hands_out_unique_numbers() {
        // Arrange
        let counter = Arc::new(FrameCounter::new());

        // Act: advance the counter from several threads at once
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || (0..250).map(|_| c.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert: contiguous from 0, no duplicates
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<u64>>());
    }
}
