//! # Frame Exchange
//!
//! The engine renders, the host presents, and neither ever sees a half
//! written buffer. See [`exchange`] for the swap rules.

pub mod exchange;
pub mod geometry;

pub use exchange::{Frame, FrameCounters, FrameExchange, FrameOutcome, FrameStats, FrameTarget};
pub use geometry::{Capabilities, Geometry};
