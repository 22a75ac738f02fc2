//! Typed label containers produced by the emitter.
//!
//! Every coordinate here is relative to the frame (`0.0..=1.0`), which the
//! [`Normalized`] marker enforces for points. Boxes are `[x, y, width,
//! height]` with `(x, y)` the top-left corner.

use serde::Serialize;

use super::coord::Coord;
use super::mask::{self, Mask};
use super::space::{FrameSize, Normalized};
use crate::openlabel::Attributes;

/// An object detection: a labeled relative box, optionally with an instance
/// mask covering that box.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub bounding_box: [f64; 4],

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<Mask>,

    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// One or more relative point rings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Polyline {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub points: Vec<Vec<Coord<Normalized>>>,
    pub closed: bool,
    pub filled: bool,

    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Polyline {
    /// Rasterizes this polyline into a detection whose box is the
    /// polyline's extent and whose mask is drawn at `frame` resolution.
    ///
    /// A polyline with no points becomes an empty, mask-less detection.
    pub fn to_detection(&self, frame: FrameSize) -> Detection {
        let (bounding_box, mask) = match mask::rasterize(&self.points, frame, self.filled, self.closed)
        {
            Some((bbox, mask)) => (bbox.to_xywh(), mask),
            None => ([0.0; 4], None),
        };
        Detection {
            label: self.label.clone(),
            bounding_box,
            mask,
            attributes: self.attributes.clone(),
        }
    }
}

/// A labeled set of relative keypoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Keypoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub points: Vec<Coord<Normalized>>,

    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Detections {
    pub detections: Vec<Detection>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Polylines {
    pub polylines: Vec<Polyline>,
}

impl Polylines {
    pub fn to_detections(&self, frame: FrameSize) -> Detections {
        Detections {
            detections: self
                .polylines
                .iter()
                .map(|polyline| polyline.to_detection(frame))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Keypoints {
    pub keypoints: Vec<Keypoint>,
}

/// Segmentations as emitted: raw polylines or rasterized instance masks.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Segmentations {
    Polylines(Polylines),
    Masks(Detections),
}

impl Segmentations {
    pub fn len(&self) -> usize {
        match self {
            Self::Polylines(polylines) => polylines.polylines.len(),
            Self::Masks(detections) => detections.detections.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The labels of one image or one video frame. Kinds that were not
/// requested stay `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LabelSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Detections>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Keypoints>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub segmentations: Option<Segmentations>,
}

impl LabelSet {
    /// Total number of labels across all kinds.
    pub fn label_count(&self) -> usize {
        self.detections.as_ref().map_or(0, |d| d.detections.len())
            + self.keypoints.as_ref().map_or(0, |k| k.keypoints.len())
            + self.segmentations.as_ref().map_or(0, Segmentations::len)
    }
}
