//! # TANDEM
//!
//! Hosts a legacy, non-reentrant engine inside a frontend's frame loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             FRONTEND THREAD                             │
//! │                                                                         │
//! │   Host::tick() ──> switch ──> reconfigure? ──> take frame ──> present   │
//! │        │                                                      ▲         │
//! └────────┼──────────────────────────────────────────────────────┼─────────┘
//!          │ grant                                          grant │
//! ┌────────▼──────────────────────────────────────────────────────┴─────────┐
//! │                              ENGINE THREAD                              │
//! │                                                                         │
//! │   drain input ──> set_size? ──> start_update ──> end_update ──> yield   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `events`: Host-to-engine input queue
//! - `engine`: The `Engine` and `Presenter` seams
//! - `host`: The per-frame driver
//! - `stats`: Tick statistics and the session report
//! - `demo`: A deterministic test pattern engine

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod demo;
pub mod engine;
pub mod events;
pub mod host;
pub mod stats;

// Re-export the kernel
pub use tandem_core as core;

pub use demo::{pattern_pixel, TestPatternEngine, VideoMode, DEFAULT_MODES};
pub use engine::{Engine, Presenter};
pub use events::{input_queue, InputEvent, InputReceiver, InputSender};
pub use host::{Host, TickOutcome};
pub use stats::{HostReport, HostStats};
