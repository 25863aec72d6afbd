//! # Exit Latch
//!
//! A boolean that only ever goes from `false` to `true`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Monotone stop flag owned by one side.
///
/// Because it never goes back to `false`, a stale read can only delay the
/// observation of an exit, never invent one.
#[derive(Debug, Default)]
pub struct ExitLatch {
    tripped: AtomicBool,
}

impl ExitLatch {
    /// Creates an untripped latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tripped: AtomicBool::new(false),
        }
    }

    /// Trips the latch. Returns `true` only for the call that tripped it.
    #[inline]
    pub fn trip(&self) -> bool {
        !self.tripped.swap(true, Ordering::AcqRel)
    }

    /// Returns whether the latch has been tripped.
    #[inline]
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }
}
