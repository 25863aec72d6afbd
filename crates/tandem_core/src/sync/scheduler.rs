//! # Handoff Scheduler
//!
//! Makes the host and the engine take turns. Exactly one of them runs at any
//! time; the only place either of them waits is [`HandoffScheduler::switch_thread`].
//!
//! ## State Machine
//!
//! ```text
//!                 switch_thread(Host)
//!   ┌─────────────┐ ───────────────────> ┌───────────────┐
//!   │ HostRunning │                      │ EngineRunning │
//!   └─────────────┘ <─────────────────── └───────────────┘
//!     (initial)     switch_thread(Engine)
//!
//!   any exit latch set ──> terminal: every park returns Cancelled
//! ```
//!
//! ## Strategy Changes
//!
//! [`set_strategy`](HandoffScheduler::set_strategy) only records a pending
//! value. The side holding control promotes it inside `switch_thread`:
//!
//! 1. read the active strategy (the one the parked peer is waiting on)
//! 2. promote the pending strategy to active
//! 3. grant the peer through the OLD strategy's primitive
//! 4. park itself on the NEW strategy's primitive
//!
//! The peer reads the new value only after it was granted, so every grant is
//! delivered through the primitive its waiter is actually parked on.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use tandem_shared::SyncStrategy;

use crate::error::HandoffResult;
use crate::sync::latch::ExitLatch;
use crate::sync::primitive::{BlockingRendezvous, Rendezvous, SpinningRendezvous};

/// Sentinel for "no pending strategy change".
const NO_PENDING: u8 = u8::MAX;

/// One of the two execution contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The thread running the hosted simulation loop.
    Engine,
    /// The thread driven by the frontend's render loop.
    Host,
}

impl Side {
    /// The other side.
    #[inline]
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Engine => Self::Host,
            Self::Host => Self::Engine,
        }
    }

    /// The direction of a handoff that gives control to this side.
    #[inline]
    #[must_use]
    pub const fn inbound(self) -> Direction {
        match self {
            Self::Engine => Direction::ToEngine,
            Self::Host => Direction::ToHost,
        }
    }

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::Engine => 0,
            Self::Host => 1,
        }
    }
}

/// Which side is about to receive control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Control moves to the engine.
    ToEngine,
    /// Control moves to the host.
    ToHost,
}

impl Direction {
    /// The side that receives control.
    #[inline]
    #[must_use]
    pub const fn receiver(self) -> Side {
        match self {
            Self::ToEngine => Side::Engine,
            Self::ToHost => Side::Host,
        }
    }

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::ToEngine => 0,
            Self::ToHost => 1,
        }
    }
}

/// Why the yielding side handed over control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SwitchReason {
    /// Ordinary handoff.
    #[default]
    None = 0,
    /// The frame geometry changed; the host must reconfigure before presenting.
    VideoModeChange = 1,
}

impl SwitchReason {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::VideoModeChange,
            _ => Self::None,
        }
    }
}

/// Both primitives of one direction plus the reason slot for it.
#[derive(Debug)]
struct Gate {
    reason: AtomicU8,
    blocking: BlockingRendezvous,
    spinning: SpinningRendezvous,
}

impl Gate {
    fn new() -> Self {
        Self {
            reason: AtomicU8::new(SwitchReason::None as u8),
            blocking: BlockingRendezvous::new(),
            spinning: SpinningRendezvous::new(),
        }
    }

    fn grant(&self, reason: SwitchReason, strategy: SyncStrategy) {
        // Published by the Release inside either grant
        self.reason.store(reason as u8, Ordering::Relaxed);
        match strategy {
            SyncStrategy::Blocking => self.blocking.grant(),
            SyncStrategy::Spinning => self.spinning.grant(),
        }
    }

    fn park<F>(&self, strategy: SyncStrategy, cancelled: F) -> HandoffResult<SwitchReason>
    where
        F: Fn() -> bool,
    {
        match strategy {
            SyncStrategy::Blocking => self.blocking.park(cancelled)?,
            SyncStrategy::Spinning => self.spinning.park(cancelled)?,
        }
        let reason = self.reason.swap(SwitchReason::None as u8, Ordering::Relaxed);
        Ok(SwitchReason::from_u8(reason))
    }

    fn interrupt(&self) {
        self.blocking.interrupt();
        self.spinning.interrupt();
    }
}

/// The rendezvous scheduler shared by the host and the engine.
///
/// The scheduler itself never checks WHO calls it: `switch_thread` must only
/// be called by the thread that currently holds control, naming its own
/// side. The handles in [`crate::session`] enforce that.
#[derive(Debug)]
pub struct HandoffScheduler {
    /// Indexed by [`Direction`].
    gates: [Gate; 2],
    /// Indexed by [`Side`].
    exits: [ExitLatch; 2],
    /// Strategy both sides currently park with.
    active: AtomicU8,
    /// Strategy to switch to at the next handoff, or [`NO_PENDING`].
    pending: AtomicU8,
    /// Number of grants issued.
    handoffs: AtomicU64,
}

impl HandoffScheduler {
    /// Creates a scheduler in the `HostRunning` state.
    #[must_use]
    pub fn new(strategy: SyncStrategy) -> Self {
        Self {
            gates: [Gate::new(), Gate::new()],
            exits: [ExitLatch::new(), ExitLatch::new()],
            active: AtomicU8::new(strategy as u8),
            pending: AtomicU8::new(NO_PENDING),
            handoffs: AtomicU64::new(0),
        }
    }

    /// The strategy waiters currently park with.
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> SyncStrategy {
        SyncStrategy::from_u8(self.active.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Requests a strategy change, applied at the next handoff.
    ///
    /// Callable from either side at any time. The last request before a
    /// handoff wins.
    pub fn set_strategy(&self, strategy: SyncStrategy) {
        self.pending.store(strategy as u8, Ordering::Release);
    }

    /// Trips the exit latch of `side` and wakes any parked waiter.
    ///
    /// Idempotent. Once any latch is tripped no side is granted control again.
    pub fn request_exit(&self, side: Side) {
        if self.exits[side.index()].trip() {
            tracing::info!(?side, "exit requested");
        }
        for gate in &self.gates {
            gate.interrupt();
        }
    }

    /// Returns whether `side` asked to exit.
    #[inline]
    #[must_use]
    pub fn exit_requested(&self, side: Side) -> bool {
        self.exits[side.index()].is_tripped()
    }

    /// Returns whether either side asked to exit.
    #[inline]
    #[must_use]
    pub fn shutting_down(&self) -> bool {
        self.exits.iter().any(ExitLatch::is_tripped)
    }

    /// Number of handoffs performed so far.
    #[inline]
    #[must_use]
    pub fn handoff_count(&self) -> u64 {
        self.handoffs.load(Ordering::Relaxed)
    }

    /// Hands control from `side` to its peer and parks until it comes back.
    ///
    /// `reason` is returned by the peer's pending `switch_thread`. The value
    /// returned here is the reason the peer attached when it yielded back.
    ///
    /// Must only be called by the side currently holding control.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`](crate::Cancelled) if an exit latch is (or
    /// becomes) set while parked.
    pub fn switch_thread(&self, side: Side, reason: SwitchReason) -> HandoffResult<SwitchReason> {
        let peer_parked_on = self.strategy();
        let mine = match self.take_pending() {
            Some(next) if next != peer_parked_on => {
                self.active.store(next as u8, Ordering::Release);
                tracing::debug!(from = %peer_parked_on, to = %next, "sync strategy changed");
                next
            }
            _ => peer_parked_on,
        };

        let outbound = side.peer().inbound();
        self.handoffs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(from = ?side, to = ?outbound.receiver(), ?reason, "handoff");

        self.gate(outbound).grant(reason, peer_parked_on);
        self.park(side, mine)
    }

    /// Parks `side` without granting anything first.
    ///
    /// Used once by the engine thread before it runs any engine code, with
    /// the strategy captured when the thread was spawned.
    pub(crate) fn await_first_turn(&self, side: Side, strategy: SyncStrategy) -> HandoffResult<()> {
        self.park(side, strategy).map(|_| ())
    }

    fn park(&self, side: Side, strategy: SyncStrategy) -> HandoffResult<SwitchReason> {
        self.gate(side.inbound())
            .park(strategy, || self.shutting_down())
    }

    #[inline]
    fn gate(&self, direction: Direction) -> &Gate {
        &self.gates[direction.index()]
    }

    fn take_pending(&self) -> Option<SyncStrategy> {
        SyncStrategy::from_u8(self.pending.swap(NO_PENDING, Ordering::AcqRel))
    }
}
