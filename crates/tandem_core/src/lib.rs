//! # TANDEM Core
//!
//! Runs a non-reentrant emulator engine on its own thread while keeping the
//! host and the engine strictly alternating:
//! - Exactly one of the two threads runs at any instant
//! - Frames cross from engine to host without locks or copies on the host side
//! - Either side can request exit; both unwind cleanly
//!
//! ## Architecture Rules
//!
//! 1. **One runner** - Control only moves through `switch_thread`
//! 2. **Ownership by control** - Frame buffers belong to whoever runs
//! 3. **Exit beats everything** - A tripped latch cancels every park
//!
//! ## Example
//!
//! ```rust,ignore
//! use tandem_core::{spawn, SwitchReason, TandemConfig};
//!
//! let mut host = spawn(&TandemConfig::default(), |engine| loop {
//!     engine.switch_thread(SwitchReason::None)?;
//! })?;
//! host.switch_thread(SwitchReason::None)?;
//! let exit = host.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod frame;
pub mod session;
pub mod sync;

pub use error::{Cancelled, HandoffResult, SetupError};
pub use frame::{
    Capabilities, Frame, FrameCounters, FrameExchange, FrameOutcome, FrameStats, FrameTarget,
    Geometry,
};
pub use session::{spawn, EngineExit, EngineHandle, Exchange, HostHandle};
pub use sync::{
    BlockingRendezvous, Direction, ExitLatch, HandoffScheduler, Rendezvous, Side,
    SpinningRendezvous, SwitchReason,
};
pub use tandem_shared::{SyncStrategy, TandemConfig, TimingMode};
