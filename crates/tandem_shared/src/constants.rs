//! # Limits & Defaults
//!
//! Values baked into the binary. Everything here can be overridden by
//! [`TandemConfig`](crate::TandemConfig) except the absolute limits.

// =============================================================================
// FRAME LIMITS
// =============================================================================

/// Bytes per pixel of every frame buffer (32-bit XRGB).
pub const BYTES_PER_PIXEL: usize = 4;

/// Default maximum frame width accepted by `set_size`.
pub const DEFAULT_MAX_WIDTH: u32 = 1280;

/// Default maximum frame height accepted by `set_size`.
pub const DEFAULT_MAX_HEIGHT: u32 = 1024;

/// Hard ceiling for a configured maximum width.
pub const ABSOLUTE_MAX_WIDTH: u32 = 4096;

/// Hard ceiling for a configured maximum height.
pub const ABSOLUTE_MAX_HEIGHT: u32 = 4096;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Busy-wait iterations between OS yields in the spinning strategy.
///
/// Two spinning threads pinned to one core would otherwise burn a whole
/// time slice each before the other side gets to run.
pub const SPIN_YIELD_INTERVAL: u32 = 1024;

/// Default name of the engine thread.
pub const ENGINE_THREAD_NAME: &str = "tandem-engine";

/// Default capacity of the host -> engine input queue.
pub const DEFAULT_INPUT_CAPACITY: usize = 256;
