//! Completion latch joining asynchronous pre-steps with the final trigger
//!
//! A batch is only fully observed once the owning routine has finished its
//! synchronous completion handling *and* every asynchronous pre-step (a
//! platform check, say) has reported back. The latch starts with one
//! pending arrival reserved for the owning routine's unconditional trigger;
//! each pre-step registers one more before it is scheduled. Whichever
//! arrival brings the count to zero releases the latch, and only that one.
//!
//! Arrivals may land in any order and on any thread. The only requirement
//! is that a pre-step registers before it can arrive.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Result of one arrival at the latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Other arrivals are still outstanding
    Pending(usize),
    /// This arrival released the latch; the caller runs the decision
    Released,
    /// The latch was released earlier; nothing to do
    AlreadyReleased,
}

/// Countdown latch with a reserved arrival for the unconditional trigger
#[derive(Debug)]
pub struct CompletionLatch {
    pending: AtomicUsize,
}

impl Default for CompletionLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionLatch {
    /// Create a latch waiting for the unconditional trigger only
    pub fn new() -> Self {
        Self {
            pending: AtomicUsize::new(1),
        }
    }

    /// Reserve one more arrival.
    ///
    /// Returns the new pending count, or `None` once the latch is released.
    pub fn register(&self) -> Option<usize> {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > 0).then(|| n + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Consume one arrival
    pub fn arrive(&self) -> Arrival {
        match self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => Arrival::Released,
            Ok(previous) => Arrival::Pending(previous - 1),
            Err(_) => Arrival::AlreadyReleased,
        }
    }

    /// Arrivals still outstanding
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the latch has been released
    pub fn is_released(&self) -> bool {
        self.pending() == 0
    }
}
