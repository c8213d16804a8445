//! Logical clock for event ordering
//!
//! Every timeline entry, window metadata stamp, and execution event carries a
//! sequence number drawn from one per-agent [`LogicalClock`]. Sequence numbers
//! are strictly increasing and unique within an agent, which gives the
//! timeline its causal order without relying on wall-clock time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic integer sequence generator.
///
/// Cheap to share behind an `Arc`; `next()` is lock-free.
///
/// # Example
/// ```
/// use casement::clock::LogicalClock;
///
/// let clock = LogicalClock::new();
/// let a = clock.next();
/// let b = clock.next();
/// assert!(b > a);
/// ```
#[derive(Debug, Default)]
pub struct LogicalClock {
    counter: AtomicU64,
}

impl LogicalClock {
    /// Create a new clock starting at zero.
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }

    /// Return the next sequence value. Strictly increasing, never reused.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Return the most recently issued value (0 if none issued yet).
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Restore the clock to a given value during snapshot import.
    ///
    /// Subsequent `next()` calls continue after `value`, so re-imported
    /// sessions never reissue sequence numbers already present in the
    /// archive.
    pub fn restore(&self, value: u64) {
        self.counter.store(value, Ordering::SeqCst);
    }
}
