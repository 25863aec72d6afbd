//! # Test Pattern Engine
//!
//! A deterministic stand-in for a real emulator core. It behaves the way a
//! legacy core does: it owns its main loop, switches video modes on its own
//! schedule and only redraws when something changed.
//!
//! ```text
//!   mode 0 ──(frames_per_mode)──> mode 1 ──> ... ──> mode 0
//!
//!   pixel(x, y) = 0xFF000000 | R(x + offset) | G(y) | B(x ^ y)
//! ```
//!
//! The pattern scrolls one pixel per frame. A key press toggles pause;
//! pointer motion nudges the pattern even while paused.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tandem_core::{EngineHandle, FrameOutcome, HandoffResult, SwitchReason};

use crate::engine::Engine;
use crate::events::{InputEvent, InputReceiver};

/// One video mode the test pattern cycles through.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoMode {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Horizontal pixel scale.
    pub scale_x: f64,
    /// Vertical pixel scale.
    pub scale_y: f64,
}

impl VideoMode {
    /// A mode with square pixels.
    #[must_use]
    pub const fn square(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Default mode schedule: a 4:3 low-res mode and a VGA mode.
pub const DEFAULT_MODES: [VideoMode; 2] = [
    VideoMode {
        width: 320,
        height: 200,
        scale_x: 1.0,
        scale_y: 1.2,
    },
    VideoMode::square(640, 480),
];

/// Colour of one test pattern pixel.
#[inline]
#[must_use]
pub const fn pattern_pixel(x: u32, y: u32, offset: u32) -> u32 {
    let red = x.wrapping_add(offset) & 0xFF;
    let green = y & 0xFF;
    let blue = (x ^ y) & 0xFF;
    0xFF00_0000 | (red << 16) | (green << 8) | blue
}

/// Deterministic demo engine.
#[derive(Debug)]
pub struct TestPatternEngine {
    modes: Vec<VideoMode>,
    frames_per_mode: u64,
    mode_index: usize,
    frames_in_mode: u64,
    offset: u32,
    paused: bool,
    nudged: bool,
    redraw: Arc<AtomicBool>,
    dirty_lines: Vec<u16>,
    frames: u64,
}

impl TestPatternEngine {
    /// Key code that toggles pause.
    pub const PAUSE_KEY: u32 = 0x20;

    /// Creates an engine cycling through [`DEFAULT_MODES`] every 120 frames.
    #[must_use]
    pub fn new() -> Self {
        Self::with_modes(DEFAULT_MODES.to_vec(), 120)
    }

    /// Creates an engine cycling through `modes`, `frames_per_mode` each.
    ///
    /// An empty `modes` list falls back to [`DEFAULT_MODES`]; a zero
    /// `frames_per_mode` never switches.
    #[must_use]
    pub fn with_modes(modes: Vec<VideoMode>, frames_per_mode: u64) -> Self {
        let modes = if modes.is_empty() {
            DEFAULT_MODES.to_vec()
        } else {
            modes
        };
        Self {
            modes,
            frames_per_mode,
            mode_index: 0,
            frames_in_mode: 0,
            offset: 0,
            paused: false,
            nudged: false,
            redraw: Arc::new(AtomicBool::new(true)),
            dirty_lines: Vec::new(),
            frames: 0,
        }
    }

    /// Frames completed so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn apply_mode(&mut self, handle: &mut EngineHandle) -> HandoffResult<()> {
        let mode = self.modes[self.mode_index];
        let redraw = Arc::clone(&self.redraw);
        let caps = handle.set_size(mode.width, mode.height, mode.scale_x, mode.scale_y, move || {
            redraw.store(true, Ordering::Relaxed);
        })?;

        match handle.geometry() {
            Some(geometry) if caps.is_displayable() => tracing::debug!(
                width = geometry.width,
                height = geometry.height,
                aspect = geometry.aspect_ratio,
                timing = ?handle.timing(),
                "test pattern mode applied"
            ),
            _ => tracing::warn!(width = mode.width, height = mode.height, "test pattern mode not displayable"),
        }
        self.frames_in_mode = 0;
        self.redraw.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key {
                code: Self::PAUSE_KEY,
                pressed: true,
            } => self.paused = !self.paused,
            InputEvent::PointerMotion { dx, .. } if dx != 0 => {
                self.offset = self.offset.wrapping_add_signed(dx);
                self.nudged = true;
            }
            _ => {}
        }
    }

    /// Renders the current offset if anything changed and returns the
    /// outcome of `end_update`.
    fn render(&mut self, handle: &mut EngineHandle) -> HandoffResult<FrameOutcome> {
        let changed = !self.paused || self.nudged || self.redraw.swap(false, Ordering::Relaxed);
        self.nudged = false;
        self.dirty_lines.clear();

        if changed {
            if let Some(mut target) = handle.start_update()? {
                let geometry = target.geometry;
                for y in 0..geometry.height {
                    for (x, pixel) in (0_u32..).zip(target.row_mut(y).iter_mut()) {
                        *pixel = pattern_pixel(x, y, self.offset);
                    }
                }
                self.dirty_lines
                    .extend((0..geometry.height).filter_map(|y| u16::try_from(y).ok()));
            }
        }

        handle.end_update(Some(self.dirty_lines.as_slice()))
    }
}

impl Default for TestPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for TestPatternEngine {
    fn run(&mut self, handle: &mut EngineHandle, input: &InputReceiver) -> HandoffResult<()> {
        self.apply_mode(handle)?;

        loop {
            for event in input.drain() {
                self.handle_input(event);
            }

            if self.frames_per_mode > 0 && self.frames_in_mode >= self.frames_per_mode && self.modes.len() > 1 {
                self.mode_index = (self.mode_index + 1) % self.modes.len();
                self.apply_mode(handle)?;
            }

            if !self.paused {
                self.offset = self.offset.wrapping_add(1);
            }
            let outcome = self.render(handle)?;
            tracing::trace!(frame = self.frames, ?outcome, "test pattern frame");

            self.frames += 1;
            self.frames_in_mode += 1;
            handle.switch_thread(SwitchReason::None)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_pixel() {
        assert_eq!(pattern_pixel(0, 0, 0), 0xFF00_0000);
        assert_eq!(pattern_pixel(1, 2, 0), 0xFF01_0203);
        assert_eq!(pattern_pixel(0, 0, 5), 0xFF05_0000);
        assert_eq!(pattern_pixel(255, 0, 1) & 0x00FF_0000, 0);
    }

    #[test]
    fn test_empty_modes_fall_back() {
        let engine = TestPatternEngine::with_modes(Vec::new(), 10);
        assert_eq!(engine.modes, DEFAULT_MODES.to_vec());
    }

    #[test]
    fn test_pause_toggle_and_nudge() {
        let mut engine = TestPatternEngine::new();
        engine.handle_input(InputEvent::Key {
            code: TestPatternEngine::PAUSE_KEY,
            pressed: true,
        });
        assert!(engine.paused);

        // Releases and other keys are ignored
        engine.handle_input(InputEvent::Key {
            code: TestPatternEngine::PAUSE_KEY,
            pressed: false,
        });
        engine.handle_input(InputEvent::Key {
            code: 1,
            pressed: true,
        });
        assert!(engine.paused);

        engine.handle_input(InputEvent::PointerMotion { dx: -3, dy: 0 });
        assert!(engine.nudged);
        assert_eq!(engine.offset, 0_u32.wrapping_sub(3));
    }
}
