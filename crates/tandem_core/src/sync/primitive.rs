//! # Rendezvous Primitives
//!
//! One direction of a handoff: a single waiter parks until the other side
//! grants it permission to run.
//!
//! ```text
//!   BLOCKING                          SPINNING
//!   ┌────────────────────────┐        ┌────────────────────────┐
//!   │ Mutex<want_to_run>     │        │ AtomicBool held        │
//!   │ Condvar                │        │                        │
//!   └────────────────────────┘        └────────────────────────┘
//!   grant: set flag, notify           grant: clear flag (Release)
//!   park:  wait on predicate          park:  spin until cleared (Acquire),
//!                                            then re-arm
//! ```
//!
//! Both check the cancellation predicate before the permission, so an exit
//! request wins over a grant that raced with it.

use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};

use tandem_shared::SPIN_YIELD_INTERVAL;

use crate::error::{Cancelled, HandoffResult};

/// A one-waiter, one-granter permission gate.
pub trait Rendezvous: Send + Sync {
    /// Parks the caller until [`grant`](Rendezvous::grant) is called.
    ///
    /// `cancelled` is polled whenever the waiter wakes; once it returns
    /// `true` the call gives up with [`Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if `cancelled()` is observed `true`.
    fn park<F>(&self, cancelled: F) -> HandoffResult<()>
    where
        F: Fn() -> bool;

    /// Lets the waiter (current or next) through.
    fn grant(&self);

    /// Wakes the waiter without permission so it re-checks cancellation.
    fn interrupt(&self);
}

// =============================================================================
// BLOCKING
// =============================================================================

/// Mutex + condition variable rendezvous.
#[derive(Debug, Default)]
pub struct BlockingRendezvous {
    want_to_run: Mutex<bool>,
    wake: Condvar,
}

impl BlockingRendezvous {
    /// Creates a gate with no pending permission.
    #[must_use]
    pub fn new() -> Self {
        Self {
            want_to_run: Mutex::new(false),
            wake: Condvar::new(),
        }
    }
}

impl Rendezvous for BlockingRendezvous {
    fn park<F>(&self, cancelled: F) -> HandoffResult<()>
    where
        F: Fn() -> bool,
    {
        let mut want_to_run = self.want_to_run.lock();
        loop {
            if cancelled() {
                return Err(Cancelled);
            }
            if *want_to_run {
                *want_to_run = false;
                return Ok(());
            }
            self.wake.wait(&mut want_to_run);
        }
    }

    fn grant(&self) {
        let mut want_to_run = self.want_to_run.lock();
        *want_to_run = true;
        self.wake.notify_one();
    }

    fn interrupt(&self) {
        // Taking the lock orders this wakeup after any predicate check
        // that is already in progress.
        let _guard = self.want_to_run.lock();
        self.wake.notify_all();
    }
}

// =============================================================================
// SPINNING
// =============================================================================

/// Busy-wait rendezvous on a single atomic flag.
#[derive(Debug)]
pub struct SpinningRendezvous {
    /// `true` while the waiter must keep waiting.
    held: AtomicBool,
}

impl SpinningRendezvous {
    /// Creates a gate with no pending permission.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(true),
        }
    }
}

impl Default for SpinningRendezvous {
    fn default() -> Self {
        Self::new()
    }
}

impl Rendezvous for SpinningRendezvous {
    fn park<F>(&self, cancelled: F) -> HandoffResult<()>
    where
        F: Fn() -> bool,
    {
        let mut spins: u32 = 0;
        loop {
            if cancelled() {
                return Err(Cancelled);
            }
            // Consume the permission and re-arm in one step
            if self
                .held
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }

            spins = spins.wrapping_add(1);
            if spins % SPIN_YIELD_INTERVAL == 0 {
                thread::yield_now();
            } else {
                hint::spin_loop();
            }
        }
    }

    #[inline]
    fn grant(&self) {
        self.held.store(false, Ordering::Release);
    }

    #[inline]
    fn interrupt(&self) {
        // The spinner polls the cancellation predicate on every iteration.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn never() -> bool {
        false
    }

    fn park_then_grant<R: Rendezvous + Default + 'static>() {
        let gate = Arc::new(R::default());

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.park(never))
        };

        thread::sleep(Duration::from_millis(10));
        gate.grant();

        assert_eq!(waiter.join().unwrap(), Ok(()));
    }

    fn grant_before_park_is_not_lost<R: Rendezvous + Default>() {
        let gate = R::default();
        gate.grant();
        assert_eq!(gate.park(never), Ok(()));
    }

    fn interrupt_cancels_waiter<R: Rendezvous + Default + 'static>() {
        let gate = Arc::new(R::default());
        let stop = Arc::new(AtomicBool::new(false));

        let waiter = {
            let gate = Arc::clone(&gate);
            let stop = Arc::clone(&stop);
            thread::spawn(move || gate.park(|| stop.load(Ordering::Acquire)))
        };

        thread::sleep(Duration::from_millis(10));
        stop.store(true, Ordering::Release);
        gate.interrupt();

        assert_eq!(waiter.join().unwrap(), Err(Cancelled));
    }

    fn cancellation_beats_permission<R: Rendezvous + Default>() {
        let gate = R::default();
        gate.grant();
        assert_eq!(gate.park(|| true), Err(Cancelled));
    }

    #[test]
    fn test_blocking_park_then_grant() {
        park_then_grant::<BlockingRendezvous>();
    }

    #[test]
    fn test_spinning_park_then_grant() {
        park_then_grant::<SpinningRendezvous>();
    }

    #[test]
    fn test_blocking_grant_before_park() {
        grant_before_park_is_not_lost::<BlockingRendezvous>();
    }

    #[test]
    fn test_spinning_grant_before_park() {
        grant_before_park_is_not_lost::<SpinningRendezvous>();
    }

    #[test]
    fn test_blocking_interrupt_cancels() {
        interrupt_cancels_waiter::<BlockingRendezvous>();
    }

    #[test]
    fn test_spinning_interrupt_cancels() {
        interrupt_cancels_waiter::<SpinningRendezvous>();
    }

    #[test]
    fn test_cancellation_beats_permission() {
        cancellation_beats_permission::<BlockingRendezvous>();
        cancellation_beats_permission::<SpinningRendezvous>();
    }

    #[test]
    fn test_permission_is_consumed() {
        let gate = SpinningRendezvous::new();
        gate.grant();
        assert_eq!(gate.park(never), Ok(()));
        // Re-armed: a second park would block, so check with a cancelling
        // predicate that only fires after the flag was checked once.
        let polls = std::cell::Cell::new(0);
        let result = gate.park(|| {
            polls.set(polls.get() + 1);
            polls.get() > 1
        });
        assert_eq!(result, Err(Cancelled));
    }
}
