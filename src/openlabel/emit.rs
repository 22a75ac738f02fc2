//! Conversion of merged objects into typed, frame-relative labels.

use serde::Serialize;
use std::collections::BTreeMap;

use super::collection::{FrameCollection, ObjectCollection};
use super::ids::FrameNumber;
use super::kinds::{LabelKind, SegmentationStyle};
use super::object::GeometryObject;
use super::value::AttributeValue;
use crate::labels::{
    Coord, Detection, Detections, FrameSize, Keypoint, Keypoints, LabelSet, Normalized, Pixel,
    Polyline, Polylines, Segmentations,
};

/// Keys consumed by polyline construction and never passed through.
const POLYLINE_RESERVED_KEYS: [&str; 3] = ["closed", "filled", "label"];

impl GeometryObject {
    /// One detection per box: `(cx, cy, w, h)` pixels become a relative
    /// top-left `[x, y, w, h]`.
    pub fn to_detections(&self, frame: FrameSize) -> Vec<Detection> {
        let attributes = self.label_attributes();
        self.bboxes
            .iter()
            .map(|&[cx, cy, w, h]| Detection {
                label: self.object_type.clone(),
                bounding_box: [
                    (cx - w / 2.0) / frame.width,
                    (cy - h / 2.0) / frame.height,
                    w / frame.width,
                    h / frame.height,
                ],
                mask: None,
                attributes: attributes.clone(),
            })
            .collect()
    }

    pub fn to_keypoints(&self, frame: FrameSize) -> Vec<Keypoint> {
        let attributes = self.label_attributes();
        self.keypoints
            .iter()
            .map(|points| Keypoint {
                label: self.object_type.clone(),
                points: points.iter().map(|p| p.to_normalized(frame)).collect(),
                attributes: attributes.clone(),
            })
            .collect()
    }

    /// One single-ring polyline per polygon.
    ///
    /// `filled` is the negation of the `is_hole` attribute (absent counts as
    /// a hole) and `closed` defaults to true.
    pub fn to_polylines(&self, frame: FrameSize) -> Vec<Polyline> {
        if self.polygons.is_empty() {
            return Vec::new();
        }

        let mut attributes = self.label_attributes();
        let filled = !attributes
            .get("is_hole")
            .map_or(true, AttributeValue::is_truthy);
        let closed = attributes
            .get("closed")
            .map_or(true, AttributeValue::is_truthy);
        for key in POLYLINE_RESERVED_KEYS {
            attributes.remove(key);
        }

        self.polygons
            .iter()
            .map(|flat| Polyline {
                label: self.object_type.clone(),
                points: vec![flat
                    .chunks_exact(2)
                    .map(|pair| Coord::<Pixel>::new(pair[0], pair[1]).to_normalized(frame))
                    .collect::<Vec<Coord<Normalized>>>()],
                closed,
                filled,
                attributes: attributes.clone(),
            })
            .collect()
    }
}

impl ObjectCollection {
    pub fn to_detections(&self, frame: FrameSize) -> Detections {
        Detections {
            detections: self.iter().flat_map(|o| o.to_detections(frame)).collect(),
        }
    }

    pub fn to_keypoints(&self, frame: FrameSize) -> Keypoints {
        Keypoints {
            keypoints: self.iter().flat_map(|o| o.to_keypoints(frame)).collect(),
        }
    }

    pub fn to_polylines(&self, frame: FrameSize) -> Polylines {
        Polylines {
            polylines: self.iter().flat_map(|o| o.to_polylines(frame)).collect(),
        }
    }

    pub fn to_segmentations(&self, frame: FrameSize, style: SegmentationStyle) -> Segmentations {
        let polylines = self.to_polylines(frame);
        match style {
            SegmentationStyle::Polyline => Segmentations::Polylines(polylines),
            SegmentationStyle::InstanceMask => Segmentations::Masks(polylines.to_detections(frame)),
        }
    }

    /// Builds the requested kinds; the rest stay `None`.
    pub fn to_labels(
        &self,
        frame: FrameSize,
        kinds: &[LabelKind],
        style: SegmentationStyle,
    ) -> LabelSet {
        let mut labels = LabelSet::default();
        for kind in kinds {
            match kind {
                LabelKind::Detections => labels.detections = Some(self.to_detections(frame)),
                LabelKind::Keypoints => labels.keypoints = Some(self.to_keypoints(frame)),
                LabelKind::Segmentations => {
                    labels.segmentations = Some(self.to_segmentations(frame, style))
                }
            }
        }
        labels
    }
}

/// Per-frame labels of one video.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameLabels {
    pub frames: BTreeMap<FrameNumber, LabelSet>,

    /// Labels of objects that never received a frame number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unframed: Option<LabelSet>,
}

impl FrameLabels {
    pub fn label_count(&self) -> usize {
        self.frames
            .values()
            .chain(self.unframed.as_ref())
            .map(LabelSet::label_count)
            .sum()
    }
}

impl FrameCollection {
    pub fn to_labels(
        &self,
        frame: FrameSize,
        kinds: &[LabelKind],
        style: SegmentationStyle,
    ) -> FrameLabels {
        let mut labels = FrameLabels::default();
        for (number, objects) in &self.frames {
            let set = objects.to_labels(frame, kinds, style);
            match number {
                Some(number) => {
                    labels.frames.insert(*number, set);
                }
                None => labels.unframed = Some(set),
            }
        }
        labels
    }
}
