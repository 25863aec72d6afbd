//! # Host Driver
//!
//! One [`Host::tick`] per displayed frame:
//!
//! ```text
//! tick():
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. RESUME ENGINE                                                    │
//! │    └─ switch_thread(), engine runs until it yields                  │
//! │                                                                     │
//! │ 2. MODE CHANGES                                                     │
//! │    └─ VideoModeChange? reconfigure presenter, resume again          │
//! │                                                                     │
//! │ 3. PRESENT                                                          │
//! │    └─ take the front buffer (fresh or duplicate) and present it     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Input sent between ticks is queued and picked up by the engine on its
//! next resume.

use std::time::Instant;

use tandem_core::{spawn, HandoffResult, HostHandle, SetupError, Side, SyncStrategy, TandemConfig};

use crate::engine::{Engine, Presenter};
use crate::events::{input_queue, InputEvent, InputSender};
use crate::stats::{HostReport, HostStats};

/// What a single tick showed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    /// A frame the presenter had not seen yet.
    Presented,
    /// The previous frame again; the engine produced nothing new.
    Duplicate,
    /// The engine has not set a video mode yet.
    NoVideo,
}

/// Drives a hosted engine from the frontend's thread.
#[derive(Debug)]
pub struct Host<P: Presenter> {
    session: HostHandle,
    presenter: P,
    input: InputSender,
    stats: HostStats,
}

impl<P: Presenter> Host<P> {
    /// Spawns `engine` on its own thread, parked until the first tick.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if the configuration is invalid or the engine
    /// thread cannot be created.
    pub fn start<E: Engine>(config: &TandemConfig, engine: E, presenter: P) -> Result<Self, SetupError> {
        let (input, receiver) = input_queue(config.input_capacity);

        let mut engine = engine;
        let session = spawn(config, move |handle| engine.run(handle, &receiver))?;
        tracing::debug!(
            timing = ?session.timing(),
            input_capacity = config.input_capacity,
            "host started"
        );

        Ok(Self {
            session,
            presenter,
            input,
            stats: HostStats::new(),
        })
    }

    /// Runs the engine for one frame and presents the result.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`](tandem_core::Cancelled) once either side asked
    /// to exit. Call [`Host::shutdown`] afterwards.
    pub fn tick(&mut self) -> HandoffResult<TickOutcome> {
        let start = Instant::now();

        self.session.advance(|geometry| {
            self.presenter.reconfigure(geometry);
            self.stats.record_mode_change();
        })?;

        let outcome = match self.session.take_frame()? {
            Some(frame) => {
                self.presenter.present(&frame);
                if frame.is_duplicate() {
                    TickOutcome::Duplicate
                } else {
                    TickOutcome::Presented
                }
            }
            None => TickOutcome::NoVideo,
        };

        self.stats.record_tick(start.elapsed(), outcome);
        Ok(outcome)
    }

    /// Queues input for the engine. Returns `false` if it was dropped.
    pub fn send_input(&self, event: InputEvent) -> bool {
        self.input.send(event)
    }

    /// Requests a strategy change, applied at the next handoff.
    pub fn set_strategy(&self, strategy: SyncStrategy) {
        tracing::debug!(%strategy, "strategy change requested by host");
        self.session.set_strategy(strategy);
    }

    /// The strategy currently in use.
    #[must_use]
    pub fn strategy(&self) -> SyncStrategy {
        self.session.strategy()
    }

    /// Asks the session to end. The next tick returns `Cancelled`.
    pub fn request_exit(&self) {
        self.session.request_exit(Side::Host);
    }

    /// Returns whether the engine asked to exit.
    #[must_use]
    pub fn engine_exited(&self) -> bool {
        self.session.exit_requested(Side::Engine)
    }

    /// Tick statistics so far.
    #[must_use]
    pub fn stats(&self) -> &HostStats {
        &self.stats
    }

    /// The presenter.
    #[must_use]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Stops the engine, joins its thread and reports on the session.
    #[must_use]
    pub fn shutdown(self) -> HostReport {
        let Self {
            session,
            input,
            stats,
            ..
        } = self;

        let frames = session.frame_stats();
        let handoffs = session.handoff_count();
        let exit = session.shutdown();

        HostReport {
            exit,
            stats,
            frames,
            handoffs,
            inputs_dropped: input.dropped_count(),
        }
    }
}
