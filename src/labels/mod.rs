//! Typed geometry and the label containers the emitter fills.
//!
//! - [`Coord`] and [`BBoxXYXY`] carry a coordinate-space marker
//!   ([`Pixel`] or [`Normalized`]).
//! - [`LabelSet`] holds the detections, keypoints and segmentations of one
//!   image or frame.

mod bbox;
mod coord;
pub mod mask;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use mask::Mask;
pub use model::{
    Detection, Detections, Keypoint, Keypoints, LabelSet, Polyline, Polylines, Segmentations,
};
pub use space::{FrameSize, Normalized, Pixel};
