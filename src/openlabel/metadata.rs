//! The top-level `metadata` mapping of an OpenLABEL document.

use serde::Serialize;
use serde_json::{Map, Value};

const POTENTIAL_FILENAME_KEYS: [&str; 4] = ["uuid", "uri", "filename", "filepath"];

/// What kind of segmentation the file says it contains.
///
/// Recorded for reporting only; the emitter is driven by
/// [`SegmentationStyle`](super::SegmentationStyle).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationHint {
    #[default]
    Instance,
    Semantic,
}

/// Parsed `openlabel.metadata`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelMetadata {
    pub raw: Map<String, Value>,
    pub segmentation: SegmentationHint,
}

impl LabelMetadata {
    /// Non-object values yield empty metadata.
    pub fn from_value(value: &Value) -> Self {
        let raw = value.as_object().cloned().unwrap_or_default();
        let segmentation = match raw.get("annotation_type").and_then(Value::as_str) {
            Some("semantic segmentation") => SegmentationHint::Semantic,
            _ => SegmentationHint::Instance,
        };
        Self { raw, segmentation }
    }

    /// Media names this file may describe, taken from the `uuid`, `uri`,
    /// `filename` and `filepath` keys (matched case-insensitively).
    pub fn potential_filenames(&self) -> Vec<String> {
        self.raw
            .iter()
            .filter(|(key, _)| POTENTIAL_FILENAME_KEYS.contains(&key.to_ascii_lowercase().as_str()))
            .filter_map(|(_, value)| value.as_str())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}
