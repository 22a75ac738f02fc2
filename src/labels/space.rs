//! Coordinate space marker types and frame dimensions.
//!
//! The markers are zero-sized types used as type parameters to distinguish
//! source pixel coordinates from frame-relative coordinates at compile time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker type for pixel coordinates in the source media.
///
/// OpenLABEL geometry is always expressed in pixels of the stream it was
/// annotated on, with (0, 0) at the top-left corner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for relative coordinates (0.0 to 1.0 of the frame).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

/// Width and height of an image or video frame, in pixels.
///
/// Dimensions are floating point because stream properties may declare
/// them that way; rasterization rounds them when it needs a pixel grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Frame dimensions as a whole-pixel grid (width, height).
    ///
    /// Non-finite or negative dimensions collapse to an empty grid.
    pub fn pixel_grid(&self) -> (usize, usize) {
        fn to_px(value: f64) -> usize {
            if value.is_finite() && value > 0.0 {
                value.round() as usize
            } else {
                0
            }
        }
        (to_px(self.width), to_px(self.height))
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
