//! # Frame Exchange
//!
//! Hands exactly one completed frame from the engine to the host per handoff.
//!
//! ## Safety Note
//!
//! The buffers live in an `UnsafeCell` and are never locked. Exclusive
//! access comes from the handoff itself: only the side holding control
//! touches them, and the grant/park pair orders every access.
//!
//! ## Unsynced Mode (double buffered)
//!
//! ```text
//!   engine renders ──> back          front ──> host presents
//!
//!   end_update(dirty):
//!     front_uploaded?  yes ──> SWAP, copy new front into new back
//!                      no  ──> DROP, ask the engine for a full redraw
//! ```
//!
//! The copy after a swap keeps the new back buffer identical to what the
//! host is about to show, so an engine that only redraws dirty lines keeps
//! drawing on top of the right picture.
//!
//! ## Synced Mode (single buffer)
//!
//! Engine and host use the same buffer; every `end_update` is a new frame.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, Ordering};

use tandem_shared::TimingMode;

use crate::frame::geometry::{Capabilities, Geometry};

/// What `end_update` did with the completed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameOutcome {
    /// No dirty lines: nothing to hand over.
    Unchanged,
    /// Synced mode: the shared buffer holds a fresh frame.
    Rendered,
    /// Unsynced mode: front and back were swapped.
    Swapped,
    /// Unsynced mode: the host has not consumed the front buffer yet, so the
    /// frame was dropped and a full redraw was requested.
    Dropped,
}

/// The buffer the engine renders into this tick.
#[derive(Debug)]
pub struct FrameTarget<'a> {
    /// Pixels, `geometry.stride()` per row.
    pub pixels: &'a mut [u32],
    /// Geometry of the current mode.
    pub geometry: Geometry,
}

impl FrameTarget<'_> {
    /// Bytes per row.
    #[inline]
    #[must_use]
    pub fn pitch(&self) -> usize {
        self.geometry.pitch
    }

    /// Mutable access to one row.
    ///
    /// # Panics
    ///
    /// Panics if `y` is outside the frame.
    #[must_use]
    pub fn row_mut(&mut self, y: u32) -> &mut [u32] {
        let stride = self.geometry.stride();
        let start = y as usize * stride;
        &mut self.pixels[start..start + stride]
    }
}

/// A frame handed to the host.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pixels: &'a [u32],
    geometry: Geometry,
    duplicate: bool,
}

impl<'a> Frame<'a> {
    /// Pixels, `geometry().stride()` per row.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &'a [u32] {
        self.pixels
    }

    /// The same pixels as raw bytes, ready for upload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.pixels)
    }

    /// Geometry of the frame.
    #[inline]
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// `true` if the host already presented this exact buffer.
    #[inline]
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.duplicate
    }

    /// One row of the frame.
    ///
    /// # Panics
    ///
    /// Panics if `y` is outside the frame.
    #[must_use]
    pub fn row(&self, y: u32) -> &'a [u32] {
        let stride = self.geometry.stride();
        let start = y as usize * stride;
        &self.pixels[start..start + stride]
    }
}

/// Snapshot of the frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames completed by the engine (`end_update` with changes).
    pub rendered: u64,
    /// Buffer swaps (unsynced).
    pub swapped: u64,
    /// Frames dropped because the host had not caught up (unsynced).
    pub dropped: u64,
    /// Frames taken by the host, duplicates included.
    pub presented: u64,
    /// Frames the host had already presented before.
    pub duplicates: u64,
}

/// Atomic frame counters, readable from either side at any time.
#[derive(Debug, Default)]
pub struct FrameCounters {
    rendered: AtomicU64,
    swapped: AtomicU64,
    dropped: AtomicU64,
    presented: AtomicU64,
    duplicates: AtomicU64,
}

impl FrameCounters {
    fn record_outcome(&self, outcome: FrameOutcome) {
        let counter = match outcome {
            FrameOutcome::Unchanged => return,
            FrameOutcome::Rendered => None,
            FrameOutcome::Swapped => Some(&self.swapped),
            FrameOutcome::Dropped => Some(&self.dropped),
        };
        self.rendered.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_presented(&self, duplicate: bool) {
        self.presented.fetch_add(1, Ordering::Relaxed);
        if duplicate {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> FrameStats {
        FrameStats {
            rendered: self.rendered.load(Ordering::Relaxed),
            swapped: self.swapped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            presented: self.presented.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// FRAME STATE (owned by whichever side holds control)
// =============================================================================

/// Buffers, latch and geometry.
#[derive(Debug)]
pub(crate) struct FrameState {
    timing: TimingMode,
    /// `buffers[0]` is the shared buffer in synced mode.
    buffers: [Vec<u32>; 2],
    /// Index of the back buffer (unsynced).
    back: usize,
    /// Host has consumed the current front buffer.
    front_uploaded: bool,
    /// Synced mode: a frame was completed since the host last looked.
    synced_fresh: bool,
    geometry: Option<Geometry>,
}

impl FrameState {
    pub(crate) fn new(timing: TimingMode) -> Self {
        Self {
            timing,
            buffers: [Vec::new(), Vec::new()],
            back: 0,
            front_uploaded: true,
            synced_fresh: false,
            geometry: None,
        }
    }

    pub(crate) fn geometry(&self) -> Option<Geometry> {
        self.geometry
    }

    pub(crate) fn resize(&mut self, geometry: Geometry) {
        let len = geometry.pixel_count();
        let used = match self.timing {
            TimingMode::Synced => 1,
            TimingMode::Unsynced => 2,
        };
        for buffer in &mut self.buffers[..used] {
            buffer.clear();
            buffer.resize(len, 0);
        }

        self.back = 0;
        self.front_uploaded = true;
        self.synced_fresh = false;
        self.geometry = Some(geometry);
    }

    pub(crate) fn start_update(&mut self) -> Option<FrameTarget<'_>> {
        let geometry = self.geometry?;
        let index = match self.timing {
            TimingMode::Synced => 0,
            TimingMode::Unsynced => self.back,
        };
        Some(FrameTarget {
            pixels: &mut self.buffers[index],
            geometry,
        })
    }

    pub(crate) fn end_update(&mut self, has_changes: bool) -> FrameOutcome {
        if self.geometry.is_none() {
            return FrameOutcome::Unchanged;
        }

        match self.timing {
            TimingMode::Synced => {
                self.synced_fresh = true;
                FrameOutcome::Rendered
            }
            TimingMode::Unsynced if !has_changes => FrameOutcome::Unchanged,
            TimingMode::Unsynced if self.front_uploaded => {
                self.back ^= 1;
                self.front_uploaded = false;

                let [first, second] = &mut self.buffers;
                let (front, back) = if self.back == 0 {
                    (second, first)
                } else {
                    (first, second)
                };
                back.copy_from_slice(front);

                FrameOutcome::Swapped
            }
            TimingMode::Unsynced => FrameOutcome::Dropped,
        }
    }

    pub(crate) fn take_front(&mut self) -> Option<Frame<'_>> {
        let geometry = self.geometry?;
        let (index, duplicate) = match self.timing {
            TimingMode::Synced => {
                let duplicate = !self.synced_fresh;
                self.synced_fresh = false;
                (0, duplicate)
            }
            TimingMode::Unsynced => {
                let duplicate = self.front_uploaded;
                self.front_uploaded = true;
                (self.back ^ 1, duplicate)
            }
        };

        Some(Frame {
            pixels: &self.buffers[index],
            geometry,
            duplicate,
        })
    }
}

// =============================================================================
// FRAME EXCHANGE
// =============================================================================

/// The shared frame exchange.
///
/// Every accessor that touches the buffers is `unsafe`: the caller must be
/// the side currently holding control of the handoff.
#[derive(Debug)]
pub struct FrameExchange {
    max_width: u32,
    max_height: u32,
    timing: TimingMode,
    state: UnsafeCell<FrameState>,
    counters: FrameCounters,
}

impl FrameExchange {
    /// Creates an exchange with no geometry yet.
    #[must_use]
    pub fn new(timing: TimingMode, max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
            timing,
            state: UnsafeCell::new(FrameState::new(timing)),
            counters: FrameCounters::default(),
        }
    }

    /// The timing mode this exchange was created with.
    #[inline]
    #[must_use]
    pub fn timing(&self) -> TimingMode {
        self.timing
    }

    /// Returns whether a mode of this size can be displayed.
    #[inline]
    #[must_use]
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        width > 0 && height > 0 && width <= self.max_width && height <= self.max_height
    }

    /// Capabilities reported for an accepted mode.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            displayable: true,
            double_buffered: self.timing == TimingMode::Unsynced,
        }
    }

    /// Frame counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        self.counters.snapshot()
    }

    /// # Safety
    ///
    /// Caller must hold control of the handoff for as long as the returned
    /// reference (or anything derived from it) lives.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    unsafe fn state_mut(&self) -> &mut FrameState {
        &mut *self.state.get()
    }

    /// # Safety
    ///
    /// See [`FrameExchange::state_mut`].
    pub(crate) unsafe fn geometry(&self) -> Option<Geometry> {
        self.state_mut().geometry()
    }

    /// # Safety
    ///
    /// See [`FrameExchange::state_mut`].
    pub(crate) unsafe fn resize(&self, geometry: Geometry) {
        self.state_mut().resize(geometry);
    }

    /// # Safety
    ///
    /// See [`FrameExchange::state_mut`].
    pub(crate) unsafe fn start_update(&self) -> Option<FrameTarget<'_>> {
        self.state_mut().start_update()
    }

    /// # Safety
    ///
    /// See [`FrameExchange::state_mut`].
    pub(crate) unsafe fn end_update(&self, has_changes: bool) -> FrameOutcome {
        let outcome = self.state_mut().end_update(has_changes);
        self.counters.record_outcome(outcome);
        tracing::trace!(?outcome, "frame completed");
        outcome
    }

    /// # Safety
    ///
    /// See [`FrameExchange::state_mut`].
    pub(crate) unsafe fn take_front(&self) -> Option<Frame<'_>> {
        let frame = self.state_mut().take_front()?;
        self.counters.record_presented(frame.is_duplicate());
        Some(frame)
    }
}

// SAFETY: the buffers are only reached through the `unsafe` accessors above,
// whose callers hold control of the handoff. The handoff's grant (Release)
// and park (Acquire) order every access from one side before every access
// from the other.
unsafe impl Sync for FrameExchange {}
