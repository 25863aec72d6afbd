//! # Frame Geometry
//!
//! Size and shape of the frames the engine renders.

use tandem_shared::BYTES_PER_PIXEL;

/// Dimensions of the current video mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub pitch: usize,
    /// Display aspect ratio (width / height after pixel scaling).
    pub aspect_ratio: f32,
}

impl Geometry {
    /// Creates a geometry with tightly packed rows.
    ///
    /// `scale_x` / `scale_y` describe the pixel shape; a 320x200 mode with
    /// `scale_y = 1.2` has a 4:3 aspect ratio.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(width: u32, height: u32, scale_x: f64, scale_y: f64) -> Self {
        let denominator = f64::from(height) * scale_y;
        let aspect_ratio = if denominator > 0.0 {
            (f64::from(width) * scale_x / denominator) as f32
        } else {
            0.0
        };

        Self {
            width,
            height,
            pitch: width as usize * BYTES_PER_PIXEL,
            aspect_ratio,
        }
    }

    /// Pixels per row (pitch in pixels).
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.pitch / BYTES_PER_PIXEL
    }

    /// Number of pixels a buffer of this geometry holds.
    #[inline]
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.stride() * self.height as usize
    }
}

/// What the host can do with frames of a requested size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// The host can display frames of this size at all.
    pub displayable: bool,
    /// Frames are double buffered (unsynced timing).
    pub double_buffered: bool,
}

impl Capabilities {
    /// The requested mode cannot be displayed.
    pub const CANNOT_DISPLAY: Self = Self {
        displayable: false,
        double_buffered: false,
    };

    /// Returns whether the mode was accepted.
    #[inline]
    #[must_use]
    pub const fn is_displayable(&self) -> bool {
        self.displayable
    }
}
