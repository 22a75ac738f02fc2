//! The accumulated geometry object and the parsing of raw object records.

use serde::Serialize;
use serde_json::Value;

use super::attributes::{direct_stream, frame_numbers, resolve_attributes, Record};
use super::ids::{FrameNumber, ObjectId};
use super::value::{AttributeValue, Attributes};
use crate::labels::{Coord, Pixel};

/// Attribute key under which the object id is exported on every label.
pub const OBJECT_ID_ATTRIBUTE: &str = "openLABEL_id";

/// One logical annotated entity, merged from every record that names its id.
///
/// Geometry only ever grows. `name`, `type` and `stream` are set once: the
/// first non-empty value sticks and later ones are ignored. Free-form
/// attributes merge per key with the later value winning.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GeometryObject {
    pub id: ObjectId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Taxonomy label, exported as the label text.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,

    /// Boxes as `[center_x, center_y, width, height]` in source pixels.
    pub bboxes: Vec<[f64; 4]>,

    /// Polygons as flat `[x0, y0, x1, y1, ...]` pixel sequences.
    pub polygons: Vec<Vec<f64>>,

    /// Keypoint sets in source pixels.
    pub keypoints: Vec<Vec<Coord<Pixel>>>,

    pub attributes: Attributes,
}

impl GeometryObject {
    /// Builds an object from its first record, returning it together with
    /// the frame numbers the record covers.
    pub fn from_record(id: impl Into<ObjectId>, record: &Record) -> (Self, Vec<FrameNumber>) {
        let mut parsed = ParsedRecord::parse(record);
        let frames = std::mem::take(&mut parsed.frame_numbers);
        (Self::from_parsed(id.into(), parsed), frames)
    }

    /// Merges a further record for the same id, returning the frame numbers
    /// that record covers.
    pub fn update_from_record(&mut self, record: &Record) -> Vec<FrameNumber> {
        let mut parsed = ParsedRecord::parse(record);
        let frames = std::mem::take(&mut parsed.frame_numbers);
        self.merge(parsed);
        frames
    }

    pub(crate) fn from_parsed(id: ObjectId, parsed: ParsedRecord) -> Self {
        Self {
            id,
            name: parsed.name,
            object_type: parsed.object_type,
            stream: parsed.stream,
            bboxes: parsed.bboxes,
            polygons: parsed.polygons,
            keypoints: parsed.keypoints,
            attributes: parsed.attributes,
        }
    }

    /// A copy without geometry or attributes: only the id and the set-once
    /// fields.
    pub(crate) fn identity(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            object_type: self.object_type.clone(),
            stream: self.stream.clone(),
            ..Self::default()
        }
    }

    pub(crate) fn merge(&mut self, parsed: ParsedRecord) {
        self.bboxes.extend(parsed.bboxes);
        self.polygons.extend(parsed.polygons);
        self.keypoints.extend(parsed.keypoints);

        if self.name.is_none() {
            self.name = parsed.name;
        }
        if self.object_type.is_none() {
            self.object_type = parsed.object_type;
        }
        if self.stream.is_none() {
            self.stream = parsed.stream;
        }

        self.attributes.extend(parsed.attributes);
    }

    /// True if the object carries no geometry of any kind.
    pub fn is_empty(&self) -> bool {
        self.bboxes.is_empty() && self.polygons.is_empty() && self.keypoints.is_empty()
    }

    /// Attributes attached to every label emitted for this object: `name`,
    /// the object id under [`OBJECT_ID_ATTRIBUTE`], then the free-form
    /// attributes (which win on key conflicts).
    pub fn label_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(name) = &self.name {
            attributes.insert("name".to_string(), name.clone().into());
        }
        attributes.insert(
            OBJECT_ID_ATTRIBUTE.to_string(),
            AttributeValue::from(self.id.as_str()),
        );
        attributes.extend(self.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        attributes
    }
}

/// Everything one raw object record contributes.
#[derive(Clone, Debug, Default)]
pub(crate) struct ParsedRecord {
    pub bboxes: Vec<[f64; 4]>,
    pub polygons: Vec<Vec<f64>>,
    pub keypoints: Vec<Vec<Coord<Pixel>>>,
    pub name: Option<String>,
    pub object_type: Option<String>,
    pub stream: Option<String>,
    pub attributes: Attributes,
    pub frame_numbers: Vec<FrameNumber>,
}

impl ParsedRecord {
    /// Parses `object_data.{bbox,poly2d,point2d}`, top-level `name`/`type`,
    /// attributes and frame intervals.
    ///
    /// Attribute precedence, lowest first: bbox entries, poly2d entries,
    /// point2d entries, the object record itself. The stream comes from the
    /// first geometry list that names one, else from the object's own
    /// attributes.
    pub fn parse(record: &Record) -> Self {
        let object_data = record.get("object_data").and_then(Value::as_object);
        let mut attributes = Attributes::new();
        let mut stream = None;

        let bbox = GeometryList::parse(object_data, "bbox");
        let poly = GeometryList::parse(object_data, "poly2d");
        let point = GeometryList::parse(object_data, "point2d");

        for list in [&bbox, &poly, &point] {
            attributes.extend(list.attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
            if stream.is_none() {
                stream = list.stream.clone();
            }
        }

        let bboxes = bbox.values.iter().filter_map(|v| parse_bbox(v)).collect();
        let polygons = poly.values.iter().filter_map(|v| parse_polygon(v)).collect();
        let keypoints = point
            .values
            .iter()
            .filter_map(|v| parse_keypoints(v))
            .collect();

        let own = resolve_attributes(record);
        attributes.extend(own.attributes);
        let stream = stream.or(own.stream);

        Self {
            bboxes,
            polygons,
            keypoints,
            name: non_empty_str(record.get("name")),
            object_type: non_empty_str(record.get("type")),
            stream,
            attributes,
            frame_numbers: frame_numbers(record),
        }
    }
}

/// The entries of one `object_data` geometry list.
struct GeometryList<'a> {
    values: Vec<&'a Value>,
    attributes: Attributes,
    stream: Option<String>,
}

impl<'a> GeometryList<'a> {
    fn parse(object_data: Option<&'a Record>, kind: &str) -> Self {
        let mut list = Self {
            values: Vec::new(),
            attributes: Attributes::new(),
            stream: None,
        };

        let entries = object_data
            .and_then(|data| data.get(kind))
            .and_then(Value::as_array);
        for entry in entries.into_iter().flatten() {
            let Some(entry) = entry.as_object() else {
                log::debug!("skipping non-object {kind} entry");
                continue;
            };

            let resolved = resolve_attributes(entry);
            if list.stream.is_none() {
                list.stream = direct_stream(entry).or(resolved.stream);
            }
            list.attributes.extend(resolved.attributes);

            match entry.get("val") {
                Some(value) => list.values.push(value),
                None => log::debug!("skipping {kind} entry without `val`"),
            }
        }

        list
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn numbers(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}

fn parse_bbox(value: &Value) -> Option<[f64; 4]> {
    match numbers(value).as_deref() {
        Some(&[cx, cy, w, h]) => Some([cx, cy, w, h]),
        _ => {
            log::debug!("dropping bbox value {value}: expected 4 numbers");
            None
        }
    }
}

fn parse_polygon(value: &Value) -> Option<Vec<f64>> {
    let points = numbers(value);
    if points.is_none() {
        log::debug!("dropping poly2d value {value}: expected a list of numbers");
    }
    points
}

/// Accepts either a flat `[x0, y0, x1, y1, ...]` list or a list of
/// `[x, y]` pairs.
fn parse_keypoints(value: &Value) -> Option<Vec<Coord<Pixel>>> {
    if let Some(flat) = numbers(value) {
        return Some(
            flat.chunks_exact(2)
                .map(|pair| Coord::new(pair[0], pair[1]))
                .collect(),
        );
    }

    let pairs: Option<Vec<Coord<Pixel>>> = value
        .as_array()?
        .iter()
        .map(|pair| match numbers(pair).as_deref() {
            Some(&[x, y, ..]) => Some(Coord::new(x, y)),
            _ => None,
        })
        .collect();
    if pairs.is_none() {
        log::debug!("dropping point2d value {value}: expected points");
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn parses_geometry_identity_and_frames() {
        let rec = record(json!({
            "name": "car-1",
            "type": "car",
            "frame_intervals": [{"frame_start": 0, "frame_end": 1}],
            "object_data": {
                "bbox": [{"name": "shape", "val": [50, 50, 20, 10], "stream": "cam0"}],
                "poly2d": [{"val": [0, 0, 10, 0, 10, 10], "closed": true}],
                "point2d": [{"val": [[1, 2], [3, 4]]}]
            }
        }));

        let (obj, frames) = GeometryObject::from_record("obj-1", &rec);

        assert_eq!(frames, vec![1, 2]);
        assert_eq!(obj.id.as_str(), "obj-1");
        assert_eq!(obj.name.as_deref(), Some("car-1"));
        assert_eq!(obj.object_type.as_deref(), Some("car"));
        assert_eq!(obj.stream.as_deref(), Some("cam0"));
        assert_eq!(obj.bboxes, vec![[50.0, 50.0, 20.0, 10.0]]);
        assert_eq!(obj.polygons, vec![vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]]);
        assert_eq!(obj.keypoints.len(), 1);
        assert_eq!(obj.keypoints[0][1].as_tuple(), (3.0, 4.0));

        // The object's own `name` overrides the geometry entry's `name`.
        assert_eq!(obj.attributes.get("name"), Some(&"car-1".into()));
        assert_eq!(obj.attributes.get("closed"), Some(&true.into()));
    }

    #[test]
    fn flat_keypoints_are_paired() {
        let rec = record(json!({
            "object_data": {"point2d": [{"val": [1, 2, 3, 4, 5]}]}
        }));
        let (obj, _) = GeometryObject::from_record("kp", &rec);
        let points: Vec<(f64, f64)> = obj.keypoints[0].iter().map(Coord::as_tuple).collect();
        assert_eq!(points, vec![(1.0, 2.0), (3.0, 4.0)]);
    }

    #[test]
    fn malformed_geometry_is_dropped() {
        let rec = record(json!({
            "object_data": {
                "bbox": [{"val": [1, 2, 3]}, {"val": [1, 2, 3, 4]}, {"no_val": true}],
                "poly2d": [{"val": ["a", 1]}]
            }
        }));
        let (obj, _) = GeometryObject::from_record("o", &rec);
        assert_eq!(obj.bboxes, vec![[1.0, 2.0, 3.0, 4.0]]);
        assert!(obj.polygons.is_empty());
    }

    #[test]
    fn update_extends_geometry_and_keeps_first_identity() {
        let (mut obj, _) = GeometryObject::from_record(
            "o",
            &record(json!({
                "object_data": {"bbox": [{"val": [1, 1, 2, 2]}]},
                "attributes": {"text": [{"name": "color", "val": "red"}]}
            })),
        );
        assert_eq!(obj.name, None);

        let frames = obj.update_from_record(&record(json!({
            "name": "late-name",
            "type": "truck",
            "frame_intervals": [{"frame_start": 4, "frame_end": 4}],
            "object_data": {"bbox": [{"val": [5, 5, 2, 2], "stream": "cam1"}]},
            "attributes": {"text": [{"name": "color", "val": "blue"}]}
        })));
        obj.update_from_record(&record(json!({
            "name": "ignored",
            "object_data": {"bbox": [{"val": [9, 9, 2, 2], "stream": "cam2"}]}
        })));

        assert_eq!(frames, vec![5]);
        assert_eq!(obj.bboxes.len(), 3);
        assert_eq!(obj.name.as_deref(), Some("late-name"));
        assert_eq!(obj.object_type.as_deref(), Some("truck"));
        assert_eq!(obj.stream.as_deref(), Some("cam1"));
        assert_eq!(obj.attributes.get("color"), Some(&"blue".into()));
    }

    #[test]
    fn stream_falls_back_to_object_attributes() {
        let rec = record(json!({
            "object_data": {"bbox": [{"val": [1, 1, 1, 1]}]},
            "attributes": {"text": [{"name": "coordinate_system", "val": "lidar_cam"}]}
        }));
        let (obj, _) = GeometryObject::from_record("o", &rec);
        assert_eq!(obj.stream.as_deref(), Some("lidar_cam"));
    }

    #[test]
    fn label_attributes_include_identity() {
        let rec = record(json!({
            "name": "ped",
            "attributes": {"num": [{"name": "age", "val": 30}]}
        }));
        let (obj, _) = GeometryObject::from_record("p-7", &rec);
        let attrs = obj.label_attributes();
        assert_eq!(attrs.get("name"), Some(&"ped".into()));
        assert_eq!(attrs.get(OBJECT_ID_ATTRIBUTE), Some(&"p-7".into()));
        assert_eq!(attrs.get("age"), Some(&AttributeValue::Int(30)));
    }
}
