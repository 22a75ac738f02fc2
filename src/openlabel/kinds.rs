//! Requested label kinds, segmentation style and media kind.

use std::fmt;
use std::str::FromStr;

use crate::error::OpenLabelError;

/// A label kind the emitter can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKind {
    Detections,
    Segmentations,
    Keypoints,
}

impl LabelKind {
    /// Every supported kind, in the order error messages list them.
    pub const ALL: [LabelKind; 3] = [Self::Detections, Self::Segmentations, Self::Keypoints];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detections => "detections",
            Self::Segmentations => "segmentations",
            Self::Keypoints => "keypoints",
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelKind {
    type Err = OpenLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| OpenLabelError::UnsupportedLabelKind {
                value: s.to_string(),
                supported: supported_kinds(),
            })
    }
}

fn supported_kinds() -> String {
    let names: Vec<String> = LabelKind::ALL
        .iter()
        .map(|kind| format!("'{kind}'"))
        .collect();
    format!("[{}]", names.join(", "))
}

/// Validates requested label kind names.
///
/// An empty request selects every kind. Unknown names fail immediately; the
/// error names the offending value (or values) and the supported set.
/// Duplicates collapse, keeping first-seen order.
pub fn parse_label_kinds<S: AsRef<str>>(names: &[S]) -> Result<Vec<LabelKind>, OpenLabelError> {
    if names.is_empty() {
        return Ok(LabelKind::ALL.to_vec());
    }

    let mut kinds = Vec::new();
    let mut bad = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        match name.parse::<LabelKind>() {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(_) => bad.push(name.to_string()),
        }
    }

    match bad.as_slice() {
        [] => Ok(kinds),
        [value] => Err(OpenLabelError::UnsupportedLabelKind {
            value: value.clone(),
            supported: supported_kinds(),
        }),
        values => Err(OpenLabelError::UnsupportedLabelKinds {
            values: format!(
                "[{}]",
                values
                    .iter()
                    .map(|v| format!("'{v}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            supported: supported_kinds(),
        }),
    }
}

/// How polygon geometry is emitted as segmentations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SegmentationStyle {
    /// Rasterize each polygon into a detection with a dense mask.
    #[default]
    InstanceMask,
    /// Emit the polygons as polylines.
    Polyline,
}

impl SegmentationStyle {
    pub fn from_use_polylines(use_polylines: bool) -> Self {
        if use_polylines {
            Self::Polyline
        } else {
            Self::InstanceMask
        }
    }
}

/// The media a store collects labels for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = OpenLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(Self::Image),
            "video" | "videos" => Ok(Self::Video),
            _ => Err(OpenLabelError::UnsupportedMediaType(s.to_string())),
        }
    }
}
