//! # Engine and Presenter Seams
//!
//! The two traits a frontend implements (or picks) to use [`Host`](crate::Host).

use tandem_core::{EngineHandle, Frame, Geometry, HandoffResult};

use crate::events::InputReceiver;

/// A hosted, non-reentrant engine.
///
/// `run` is the engine's main loop. It owns the engine thread for the whole
/// session and yields to the host through `handle` once per frame. It must
/// return as soon as any handle call returns [`Cancelled`](tandem_core::Cancelled),
/// usually by propagating it with `?`.
pub trait Engine: Send + 'static {
    /// Runs the engine until it finishes or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`](tandem_core::Cancelled) when an exit was
    /// requested by either side.
    fn run(&mut self, handle: &mut EngineHandle, input: &InputReceiver) -> HandoffResult<()>;
}

/// Puts frames on screen (or wherever they go).
pub trait Presenter {
    /// The engine switched video mode.
    fn reconfigure(&mut self, geometry: &Geometry);

    /// Shows one frame. Duplicates are passed too so the presenter can keep
    /// its own cadence.
    fn present(&mut self, frame: &Frame<'_>);
}
