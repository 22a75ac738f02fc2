//! Camera streams and the per-file registry that maps URIs to them.

use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;

use super::attributes::Record;
use crate::labels::FrameSize;

const HEIGHT_KEYS: [&str; 2] = ["height", "height_px"];
const WIDTH_KEYS: [&str; 2] = ["width", "width_px"];

/// Only streams of this type are registered.
pub const CAMERA_STREAM_TYPE: &str = "camera";

/// A named sensor stream (camera) with optional URI and frame dimensions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StreamRecord {
    pub name: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub stream_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(skip)]
    pub properties: Option<Map<String, Value>>,

    pub height: Option<f64>,
    pub width: Option<f64>,
}

/// The four fields a stream mapping may carry.
struct StreamFields {
    stream_type: Option<String>,
    properties: Option<Map<String, Value>>,
    uri: Option<String>,
    description: Option<String>,
}

impl StreamFields {
    fn parse(record: &Record) -> Self {
        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            stream_type: text("type"),
            properties: record
                .get("stream_properties")
                .and_then(Value::as_object)
                .filter(|props| !props.is_empty())
                .cloned(),
            uri: text("uri"),
            description: text("description"),
        }
    }
}

impl StreamRecord {
    /// A nameless stream carrying only a URI, returned when nothing is
    /// registered for it.
    pub fn placeholder(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Builds a stream from its `streams` mapping entry, or `None` unless
    /// the entry is a camera.
    pub fn from_anno_dict(name: &str, record: &Record) -> Option<Self> {
        let fields = StreamFields::parse(record);
        if fields.stream_type.as_deref() != Some(CAMERA_STREAM_TYPE) {
            return None;
        }

        let mut stream = Self {
            name: Some(name.to_string()),
            stream_type: fields.stream_type,
            description: fields.description,
            uri: fields.uri,
            properties: None,
            height: None,
            width: None,
        };
        if let Some(properties) = fields.properties {
            stream.scan_dimensions(&properties);
            stream.properties = Some(properties);
        }
        Some(stream)
    }

    /// Overlays a later mapping for the same stream name. Each present,
    /// non-empty field replaces the stored one; dimensions found in new
    /// properties overwrite those already known.
    pub fn update_from_dict(&mut self, record: &Record) {
        let fields = StreamFields::parse(record);
        if fields.uri.is_some() {
            self.uri = fields.uri;
        }
        if let Some(properties) = fields.properties {
            self.scan_dimensions(&properties);
            self.properties = Some(properties);
        }
        if fields.description.is_some() {
            self.description = fields.description;
        }
        if fields.stream_type.is_some() {
            self.stream_type = fields.stream_type;
        }
    }

    /// Frame dimensions, when both are known.
    pub fn frame_size(&self) -> Option<FrameSize> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(FrameSize::new(width, height)),
            _ => None,
        }
    }

    fn scan_dimensions(&mut self, properties: &Map<String, Value>) {
        for (key, value) in properties {
            match value {
                Value::Number(n) => {
                    let Some(n) = n.as_f64() else { continue };
                    let key = key.to_ascii_lowercase();
                    if HEIGHT_KEYS.contains(&key.as_str()) {
                        self.height = Some(n);
                    }
                    if WIDTH_KEYS.contains(&key.as_str()) {
                        self.width = Some(n);
                    }
                }
                Value::Object(nested) => self.scan_dimensions(nested),
                _ => {}
            }
        }
    }
}

/// The streams declared by one label file, indexed by name and by URI.
#[derive(Clone, Debug, Default)]
pub struct StreamRegistry {
    streams: BTreeMap<String, StreamRecord>,
    uri_to_names: BTreeMap<String, Vec<String>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or updates the stream called `name`.
    ///
    /// Non-camera streams are ignored on first sight. Once a stream has a
    /// URI its name is listed under that URI (in first-registration order).
    pub fn add_stream_dict(&mut self, name: &str, record: &Record) {
        if let Some(existing) = self.streams.get_mut(name) {
            existing.update_from_dict(record);
        } else {
            let Some(stream) = StreamRecord::from_anno_dict(name, record) else {
                log::debug!("ignoring non-camera stream `{name}`");
                return;
            };
            self.streams.insert(name.to_string(), stream);
        }

        let Some(uri) = self.streams.get(name).and_then(|s| s.uri.clone()) else {
            return;
        };
        let names = self.uri_to_names.entry(uri).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    /// Adds every entry of a `streams` mapping.
    pub fn add_streams(&mut self, streams: &Record) {
        for (name, record) in streams {
            if let Some(record) = record.as_object() {
                self.add_stream_dict(name, record);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&StreamRecord> {
        self.streams.get(name)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Every URI some registered stream points at.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.uri_to_names.keys().map(String::as_str)
    }

    /// The first stream registered for `uri`, or a placeholder carrying
    /// only the URI.
    pub fn get_one_stream(&self, uri: &str) -> Cow<'_, StreamRecord> {
        self.uri_to_names
            .get(uri)
            .and_then(|names| names.first())
            .and_then(|name| self.streams.get(name))
            .map(Cow::Borrowed)
            .unwrap_or_else(|| Cow::Owned(StreamRecord::placeholder(uri)))
    }
}
