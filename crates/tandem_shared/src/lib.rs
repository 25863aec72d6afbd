//! # TANDEM Shared
//!
//! Types both the host and the hosted engine agree on.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER spawn threads or own synchronization state.
//! If you need a lock or an atomic, put it in `tandem_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;

pub use config::{ConfigError, SyncStrategy, TandemConfig, TimingMode};
pub use constants::{
    ABSOLUTE_MAX_HEIGHT, ABSOLUTE_MAX_WIDTH, BYTES_PER_PIXEL, DEFAULT_INPUT_CAPACITY,
    DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH, ENGINE_THREAD_NAME, SPIN_YIELD_INTERVAL,
};
