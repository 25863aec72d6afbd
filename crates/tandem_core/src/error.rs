//! # Core Error Types
//!
//! Two kinds of failure exist in this crate, each with its own type:
//!
//! - [`Cancelled`] is not really an error. It is the one-way signal that an
//!   exit was requested while a side was (or was about to be) parked. It
//!   travels with `?` up to the engine thread's entry point.
//! - [`SetupError`] is fatal and only happens while a session is created.

use thiserror::Error;

use tandem_shared::ConfigError;

/// The handoff was cancelled because one side asked to exit.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("handoff cancelled: an exit was requested")]
pub struct Cancelled;

/// Errors that can occur while creating a session.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The OS refused to create the engine thread.
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The session configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for anything that may be interrupted by an exit request.
pub type HandoffResult<T> = Result<T, Cancelled>;
