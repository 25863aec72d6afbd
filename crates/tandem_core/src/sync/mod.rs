//! # Handoff Synchronization
//!
//! ARCHITECT'S ORDER: two threads, one runs. Never both.
//!
//! ## The Problem
//!
//! ```text
//! Engine thread:  legacy main loop, blocks forever, cannot be stepped
//! Host thread:    called once per displayed frame, must return
//!
//! Both running at once:  RACE CONDITION on frame buffers -> TEARING
//! Host waiting forever:  FROZEN FRONTEND
//! ```
//!
//! ## The Solution: Rendezvous
//!
//! ```text
//! Host:    ──run──┐ park ─────────────┌──run──┐ park ...
//!                 │ grant             │ grant │
//! Engine:  park ──└──run──────────────┘ park  └──run ...
//! ```
//!
//! Each side grants the other and parks in the same call. The grant is the
//! only synchronization the frame data ever needs.

mod latch;
mod primitive;
mod scheduler;

pub use latch::ExitLatch;
pub use primitive::{BlockingRendezvous, Rendezvous, SpinningRendezvous};
pub use scheduler::{Direction, HandoffScheduler, Side, SwitchReason};
