//! Attribute flattening, stream identity, and frame-interval expansion.
//!
//! These are pure functions over one raw OpenLABEL record (an object, an
//! `object_data` entry, ...). They never fail: entries that do not have the
//! expected shape are skipped.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::ids::FrameNumber;
use super::value::{AttributeValue, Attributes};

/// A raw OpenLABEL record.
pub type Record = Map<String, Value>;

/// Structural keys that never become attributes.
pub const IGNORED_KEYS: [&str; 5] = [
    "frame_intervals",
    "val",
    "attributes",
    "object_data",
    "object_data_pointers",
];

/// Attribute names (case-insensitive) that identify the owning stream.
const STREAM_KEYS: [&str; 2] = ["stream", "coordinate_system"];

/// Intervals spanning more frames than this are treated as malformed.
const MAX_INTERVAL_FRAMES: u64 = 1 << 24;

/// Attributes extracted from one record, plus the stream they name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedAttributes {
    pub attributes: Attributes,
    pub stream: Option<String>,
}

/// Flattens a record's attributes.
///
/// Top-level keys are copied verbatim except for [`IGNORED_KEYS`]. Every
/// `{name, val}` entry in each bucket of the `attributes` sub-mapping
/// (`text`, `num`, `boolean`, `vec`, ...) is then written under its name. An
/// entry named `stream` or `coordinate_system` also sets the stream; the
/// first such entry wins.
pub fn resolve_attributes(record: &Record) -> ResolvedAttributes {
    let mut attributes: Attributes = record
        .iter()
        .filter(|(key, _)| !IGNORED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), AttributeValue::from_json(value)))
        .collect();
    let mut stream = None;

    let buckets = record.get("attributes").and_then(Value::as_object);
    for entries in buckets.into_iter().flat_map(|b| b.values()) {
        let Some(entries) = entries.as_array() else {
            continue;
        };

        for entry in entries {
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                continue;
            };
            let value = entry
                .get("val")
                .map(AttributeValue::from_json)
                .unwrap_or(AttributeValue::Null);
            let lowered = name.to_ascii_lowercase();

            if stream.is_none() && STREAM_KEYS.contains(&lowered.as_str()) {
                stream = value.as_stream_name();
            }
            if !IGNORED_KEYS.contains(&lowered.as_str()) {
                attributes.insert(name.to_string(), value);
            }
        }
    }

    ResolvedAttributes { attributes, stream }
}

/// The stream an `object_data` entry names directly, via its `stream` key
/// or else its `coordinate_system` key.
pub fn direct_stream(record: &Record) -> Option<String> {
    STREAM_KEYS
        .iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
        .and_then(|value| AttributeValue::from_json(value).as_stream_name())
}

/// Expands `frame_intervals` into sorted, deduplicated 1-based frame
/// numbers.
///
/// An interval `{frame_start: s, frame_end: e}` covers 0-based frames `s..=e`,
/// which become `s + 1 ..= e + 1`.
pub fn frame_numbers(record: &Record) -> Vec<FrameNumber> {
    let mut frames = BTreeSet::new();

    let intervals = record.get("frame_intervals").and_then(Value::as_array);
    for interval in intervals.into_iter().flatten() {
        let start = interval.get("frame_start").and_then(frame_bound);
        let end = interval.get("frame_end").and_then(frame_bound);
        let (Some(start), Some(end)) = (start, end) else {
            log::debug!("skipping malformed frame interval {interval}");
            continue;
        };
        if end < start {
            continue;
        }
        if end - start >= MAX_INTERVAL_FRAMES {
            log::warn!("skipping frame interval {start}..={end}: too many frames");
            continue;
        }
        // Both bounds must still be valid once shifted to 1-based numbers.
        let (Some(first), Some(last)) = (to_frame_number(start), to_frame_number(end)) else {
            log::debug!("skipping frame interval {start}..={end}: out of range");
            continue;
        };

        frames.extend(first..=last);
    }

    frames.into_iter().collect()
}

/// Shifts a 0-based index to a 1-based [`FrameNumber`], if it fits.
fn to_frame_number(index: u64) -> Option<FrameNumber> {
    index
        .checked_add(1)
        .and_then(|number| FrameNumber::try_from(number).ok())
}

/// Reads a 0-based frame bound stored as a JSON integer or integer string.
fn frame_bound(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn copies_top_level_keys_except_structural() {
        let rec = record(json!({
            "name": "car-1",
            "type": "car",
            "val": [1, 2, 3, 4],
            "frame_intervals": [],
            "object_data": {},
            "object_data_pointers": {}
        }));
        let resolved = resolve_attributes(&rec);

        let keys: Vec<&str> = resolved.attributes.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "type"]);
        assert_eq!(resolved.stream, None);
    }

    #[test]
    fn flattens_attribute_buckets_and_finds_stream() {
        let rec = record(json!({
            "attributes": {
                "boolean": [{"name": "occluded", "val": true}],
                "text": [
                    {"name": "Stream", "val": "cam_front"},
                    {"name": "coordinate_system", "val": "cam_rear"},
                    {"name": "val", "val": "ignored"}
                ]
            }
        }));
        let resolved = resolve_attributes(&rec);

        assert_eq!(resolved.stream.as_deref(), Some("cam_front"));
        assert_eq!(
            resolved.attributes.get("occluded"),
            Some(&AttributeValue::Bool(true))
        );
        assert_eq!(
            resolved.attributes.get("Stream"),
            Some(&AttributeValue::from("cam_front"))
        );
        assert!(!resolved.attributes.contains_key("val"));
    }

    #[test]
    fn skips_malformed_attribute_entries() {
        let rec = record(json!({
            "attributes": {
                "text": [{"val": "no name"}, 7, {"name": "ok", "val": "yes"}],
                "num": "not a list"
            }
        }));
        let resolved = resolve_attributes(&rec);
        assert_eq!(resolved.attributes.len(), 1);
        assert_eq!(
            resolved.attributes.get("ok"),
            Some(&AttributeValue::from("yes"))
        );
    }

    #[test]
    fn frame_interval_is_one_based_and_inclusive() {
        let rec = record(json!({
            "frame_intervals": [{"frame_start": 0, "frame_end": 2}]
        }));
        assert_eq!(frame_numbers(&rec), vec![1, 2, 3]);
    }

    #[test]
    fn frame_intervals_are_deduplicated_and_sorted() {
        let rec = record(json!({
            "frame_intervals": [
                {"frame_start": 5, "frame_end": 6},
                {"frame_start": "1", "frame_end": "2"},
                {"frame_start": 2, "frame_end": 5},
                {"frame_start": 9, "frame_end": 8},
                {"frame_start": "x", "frame_end": 3}
            ]
        }));
        assert_eq!(frame_numbers(&rec), vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn frame_intervals_past_the_frame_range_are_skipped() {
        let last = u64::from(FrameNumber::MAX);
        let rec = record(json!({
            "frame_intervals": [
                {"frame_start": u64::MAX, "frame_end": u64::MAX},
                {"frame_start": last - 1, "frame_end": last},
                {"frame_start": last - 2, "frame_end": last - 1},
                {"frame_start": 0, "frame_end": 0}
            ]
        }));
        assert_eq!(frame_numbers(&rec), vec![1, FrameNumber::MAX - 1, FrameNumber::MAX]);
    }

    #[test]
    fn direct_stream_prefers_stream_key() {
        let rec = record(json!({"coordinate_system": "cs", "stream": "cam"}));
        assert_eq!(direct_stream(&rec).as_deref(), Some("cam"));

        let rec = record(json!({"stream": null, "coordinate_system": "cs"}));
        assert_eq!(direct_stream(&rec).as_deref(), Some("cs"));
    }
}
