//! # Engine Session
//!
//! Glues the scheduler and the frame exchange into one shared [`Exchange`]
//! and hands out exactly two handles to it:
//!
//! ```text
//!                    ┌──────────────────────────┐
//!                    │    Arc<Exchange>         │
//!                    │  ┌────────────────────┐  │
//!                    │  │ HandoffScheduler   │  │
//!                    │  ├────────────────────┤  │
//!                    │  │ FrameExchange      │  │
//!                    │  └────────────────────┘  │
//!                    └─────────┬────────────────┘
//!                 ┌────────────┴────────────┐
//!                 ▼                         ▼
//!         ┌──────────────┐          ┌──────────────┐
//!         │ HostHandle   │          │ EngineHandle │
//!         │ (caller)     │          │ (spawned)    │
//!         └──────────────┘          └──────────────┘
//! ```
//!
//! Each handle remembers whether its side holds control. Frame data is only
//! reachable while it does; once a handoff is cancelled the handle stays
//! locked out for good and every call returns [`Cancelled`].

#![allow(unsafe_code)]

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tandem_shared::{SyncStrategy, TandemConfig, TimingMode};

use crate::error::{Cancelled, HandoffResult, SetupError};
use crate::frame::{Capabilities, Frame, FrameExchange, FrameOutcome, FrameStats, FrameTarget, Geometry};
use crate::sync::{HandoffScheduler, Side, SwitchReason};

/// State shared by the host and the engine.
#[derive(Debug)]
pub struct Exchange {
    scheduler: HandoffScheduler,
    frames: FrameExchange,
}

impl Exchange {
    /// Creates the shared state for one session.
    #[must_use]
    pub fn new(config: &TandemConfig) -> Self {
        Self {
            scheduler: HandoffScheduler::new(config.strategy),
            frames: FrameExchange::new(config.timing, config.max_width, config.max_height),
        }
    }

    /// The handoff scheduler.
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &HandoffScheduler {
        &self.scheduler
    }

    /// The frame exchange (counters and limits only; buffers need a handle).
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &FrameExchange {
        &self.frames
    }
}

/// How the engine thread ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineExit {
    /// The engine body returned `Ok(())` on its own.
    Finished,
    /// The engine body returned [`Cancelled`], usually because an exit
    /// was requested.
    Cancelled,
    /// The engine thread panicked.
    Panicked,
}

/// Spawns the engine thread and returns the host's handle.
///
/// The engine thread parks immediately; `engine` starts running on the
/// host's first [`HostHandle::switch_thread`].
///
/// # Errors
///
/// Returns [`SetupError::Config`] for an invalid configuration and
/// [`SetupError::Spawn`] if the thread cannot be created.
pub fn spawn<F>(config: &TandemConfig, engine: F) -> Result<HostHandle, SetupError>
where
    F: FnOnce(&mut EngineHandle) -> HandoffResult<()> + Send + 'static,
{
    config.validate()?;

    let exchange = Arc::new(Exchange::new(config));
    // The engine's first park must use the strategy the host's first grant
    // will use, which is the active one right now.
    let strategy = exchange.scheduler().strategy();

    let thread = thread::Builder::new()
        .name(config.engine_thread_name.clone())
        .spawn({
            let exchange = Arc::clone(&exchange);
            move || engine_main(exchange, strategy, engine)
        })?;

    tracing::info!(
        thread = %config.engine_thread_name,
        %strategy,
        timing = ?config.timing,
        "engine session started"
    );

    Ok(HostHandle {
        exchange,
        engine: Some(thread),
        holds_control: true,
    })
}

/// Trips the engine's exit latch when the engine thread leaves its body,
/// whether it returns or unwinds.
struct EngineExitGuard(Arc<Exchange>);

impl Drop for EngineExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!("engine thread panicked");
        }
        self.0.scheduler().request_exit(Side::Engine);
    }
}

fn engine_main<F>(exchange: Arc<Exchange>, strategy: SyncStrategy, engine: F) -> EngineExit
where
    F: FnOnce(&mut EngineHandle) -> HandoffResult<()>,
{
    let _guard = EngineExitGuard(Arc::clone(&exchange));
    let mut handle = EngineHandle {
        exchange,
        holds_control: false,
        on_redraw: None,
    };

    let result = handle
        .exchange
        .scheduler()
        .await_first_turn(Side::Engine, strategy)
        .and_then(|()| {
            handle.holds_control = true;
            engine(&mut handle)
        });
    // The guard wakes the parked host on the way out
    handle.holds_control = false;

    match result {
        Ok(()) => {
            tracing::debug!("engine finished on its own");
            EngineExit::Finished
        }
        Err(Cancelled) => {
            tracing::debug!("engine body returned cancelled");
            EngineExit::Cancelled
        }
    }
}

/// Gives control away and records whether it came back.
fn hand_off(
    exchange: &Exchange,
    side: Side,
    holds_control: &mut bool,
    reason: SwitchReason,
) -> HandoffResult<SwitchReason> {
    if !*holds_control {
        return Err(Cancelled);
    }
    *holds_control = false;
    let resumed_with = exchange.scheduler().switch_thread(side, reason)?;
    *holds_control = true;
    Ok(resumed_with)
}

// =============================================================================
// HOST HANDLE
// =============================================================================

/// The host side of a session.
///
/// Dropping the handle shuts the session down.
#[derive(Debug)]
pub struct HostHandle {
    exchange: Arc<Exchange>,
    engine: Option<JoinHandle<EngineExit>>,
    holds_control: bool,
}

impl HostHandle {
    /// Runs the engine until it yields back.
    ///
    /// Returns the reason the engine attached.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once either side asked to exit. After that the
    /// host must stop switching and call [`HostHandle::shutdown`].
    pub fn switch_thread(&mut self, reason: SwitchReason) -> HandoffResult<SwitchReason> {
        hand_off(&self.exchange, Side::Host, &mut self.holds_control, reason)
    }

    /// Runs the engine until it yields back with an ordinary handoff.
    ///
    /// Every `VideoModeChange` on the way is drained: `on_mode_change` gets
    /// the new geometry and the engine is resumed right away.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once either side asked to exit.
    pub fn advance<F>(&mut self, mut on_mode_change: F) -> HandoffResult<()>
    where
        F: FnMut(&Geometry),
    {
        while self.switch_thread(SwitchReason::None)? == SwitchReason::VideoModeChange {
            if let Some(geometry) = self.geometry() {
                tracing::debug!(
                    width = geometry.width,
                    height = geometry.height,
                    aspect = geometry.aspect_ratio,
                    "video mode changed"
                );
                on_mode_change(&geometry);
            }
        }
        Ok(())
    }

    /// Current geometry, if the engine has set one and the host holds control.
    #[must_use]
    pub fn geometry(&self) -> Option<Geometry> {
        if !self.holds_control {
            return None;
        }
        // SAFETY: the host holds control; the engine is parked.
        unsafe { self.exchange.frames().geometry() }
    }

    /// Takes the current front buffer for presentation.
    ///
    /// Returns `Ok(None)` before the engine has set a video mode. A frame
    /// the host already presented comes back marked as a duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the host no longer holds control.
    pub fn take_frame(&mut self) -> HandoffResult<Option<Frame<'_>>> {
        if !self.holds_control {
            return Err(Cancelled);
        }
        // SAFETY: the host holds control, and the returned frame borrows
        // `self` mutably so no handoff can happen while it is alive.
        Ok(unsafe { self.exchange.frames().take_front() })
    }

    /// Requests a strategy change, applied at the next handoff.
    pub fn set_strategy(&self, strategy: SyncStrategy) {
        self.exchange.scheduler().set_strategy(strategy);
    }

    /// The strategy currently in use.
    #[must_use]
    pub fn strategy(&self) -> SyncStrategy {
        self.exchange.scheduler().strategy()
    }

    /// Trips the exit latch of `side`.
    pub fn request_exit(&self, side: Side) {
        self.exchange.scheduler().request_exit(side);
    }

    /// Returns whether `side` asked to exit.
    #[must_use]
    pub fn exit_requested(&self, side: Side) -> bool {
        self.exchange.scheduler().exit_requested(side)
    }

    /// Returns whether the host currently holds control.
    #[must_use]
    pub fn holds_control(&self) -> bool {
        self.holds_control
    }

    /// The session's timing mode.
    #[must_use]
    pub fn timing(&self) -> TimingMode {
        self.exchange.frames().timing()
    }

    /// Frame counters.
    #[must_use]
    pub fn frame_stats(&self) -> FrameStats {
        self.exchange.frames().stats()
    }

    /// Number of handoffs performed so far, in both directions.
    #[must_use]
    pub fn handoff_count(&self) -> u64 {
        self.exchange.scheduler().handoff_count()
    }

    /// Stops the engine and waits for its thread.
    ///
    /// Trips the engine's exit latch, performs the final handoff (which the
    /// engine observes as a cancellation) and joins the thread.
    #[must_use]
    pub fn shutdown(mut self) -> EngineExit {
        self.finish().unwrap_or(EngineExit::Cancelled)
    }

    fn finish(&mut self) -> Option<EngineExit> {
        let thread = self.engine.take()?;

        self.exchange.scheduler().request_exit(Side::Engine);
        if self.holds_control {
            // Grants the engine, which wakes into the tripped latch
            let _ = self.switch_thread(SwitchReason::None);
        }

        let exit = thread.join().unwrap_or(EngineExit::Panicked);
        tracing::info!(
            ?exit,
            handoffs = self.exchange.scheduler().handoff_count(),
            "engine session closed"
        );
        Some(exit)
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

// =============================================================================
// ENGINE HANDLE
// =============================================================================

/// The engine side of a session. Lives on the engine thread only.
pub struct EngineHandle {
    exchange: Arc<Exchange>,
    holds_control: bool,
    on_redraw: Option<Box<dyn FnMut()>>,
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("holds_control", &self.holds_control)
            .field("has_redraw_callback", &self.on_redraw.is_some())
            .finish_non_exhaustive()
    }
}

impl EngineHandle {
    /// Yields to the host until it hands control back.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once either side asked to exit. The engine must
    /// return it from its entry point without further work.
    pub fn switch_thread(&mut self, reason: SwitchReason) -> HandoffResult<SwitchReason> {
        hand_off(&self.exchange, Side::Engine, &mut self.holds_control, reason)
    }

    /// Sets a new video mode and lets the host reconfigure before returning.
    ///
    /// `on_redraw` is called whenever a completed frame had to be dropped, so
    /// the engine can redraw the whole next frame instead of dirty lines.
    ///
    /// Returns [`Capabilities::CANNOT_DISPLAY`] without a handoff if the size
    /// is zero or exceeds the configured limits.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if an exit was requested during the handoff.
    pub fn set_size<F>(
        &mut self,
        width: u32,
        height: u32,
        scale_x: f64,
        scale_y: f64,
        on_redraw: F,
    ) -> HandoffResult<Capabilities>
    where
        F: FnMut() + 'static,
    {
        if !self.holds_control {
            return Err(Cancelled);
        }
        if !self.exchange.frames().accepts(width, height) {
            tracing::warn!(width, height, "video mode rejected, exceeds frame limits");
            return Ok(Capabilities::CANNOT_DISPLAY);
        }

        let geometry = Geometry::new(width, height, scale_x, scale_y);
        // SAFETY: the engine holds control; the host is parked.
        unsafe { self.exchange.frames().resize(geometry) };
        self.on_redraw = Some(Box::new(on_redraw));

        self.switch_thread(SwitchReason::VideoModeChange)?;
        Ok(self.exchange.frames().capabilities())
    }

    /// The buffer to render into this tick.
    ///
    /// Returns `Ok(None)` before the first successful [`set_size`](Self::set_size).
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the engine no longer holds control.
    pub fn start_update(&mut self) -> HandoffResult<Option<FrameTarget<'_>>> {
        if !self.holds_control {
            return Err(Cancelled);
        }
        // SAFETY: the engine holds control, and the target borrows `self`
        // mutably so no handoff can happen while it is alive.
        Ok(unsafe { self.exchange.frames().start_update() })
    }

    /// Marks the frame complete.
    ///
    /// `dirty_lines` lists the changed lines; `None` or an empty slice means
    /// nothing changed.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] if the engine no longer holds control.
    pub fn end_update(&mut self, dirty_lines: Option<&[u16]>) -> HandoffResult<FrameOutcome> {
        if !self.holds_control {
            return Err(Cancelled);
        }
        let has_changes = dirty_lines.is_some_and(|lines| !lines.is_empty());
        // SAFETY: the engine holds control; the host is parked.
        let outcome = unsafe { self.exchange.frames().end_update(has_changes) };

        if outcome == FrameOutcome::Dropped {
            if let Some(on_redraw) = self.on_redraw.as_mut() {
                on_redraw();
            }
        }
        Ok(outcome)
    }

    /// Current geometry, if set.
    #[must_use]
    pub fn geometry(&self) -> Option<Geometry> {
        if !self.holds_control {
            return None;
        }
        // SAFETY: the engine holds control; the host is parked.
        unsafe { self.exchange.frames().geometry() }
    }

    /// Requests a strategy change, applied at the next handoff.
    pub fn set_strategy(&self, strategy: SyncStrategy) {
        self.exchange.scheduler().set_strategy(strategy);
    }

    /// The strategy currently in use.
    #[must_use]
    pub fn strategy(&self) -> SyncStrategy {
        self.exchange.scheduler().strategy()
    }

    /// Trips the exit latch of `side`.
    pub fn request_exit(&self, side: Side) {
        self.exchange.scheduler().request_exit(side);
    }

    /// Returns whether `side` asked to exit.
    #[must_use]
    pub fn exit_requested(&self, side: Side) -> bool {
        self.exchange.scheduler().exit_requested(side)
    }

    /// The session's timing mode.
    #[must_use]
    pub fn timing(&self) -> TimingMode {
        self.exchange.frames().timing()
    }
}
