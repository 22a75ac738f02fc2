//! The annotation store: merges label files into per-URI collections.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use super::accumulator::{FlatAccumulator, FrameAccumulator, ObjectAccumulator};
use super::attributes::Record;
use super::collection::ObjectGroup;
use super::ids::{FrameNumber, LabelFileId, ObjectId};
use super::metadata::LabelMetadata;
use super::stream::{StreamRecord, StreamRegistry};
use crate::error::OpenLabelError;

/// Store collecting image labels: one object collection per URI.
pub type ImageAnnotations = AnnotationStore<FlatAccumulator>;

/// Store collecting video labels: per-frame collections per URI.
pub type VideoAnnotations = AnnotationStore<FrameAccumulator>;

/// Merged annotations of every label file parsed in one import run.
///
/// Files are parsed one at a time. Each file's objects are grouped by the
/// stream they belong to and merged into the collection of every URI the
/// file may describe: the owning stream's URI, the label file's own id, and
/// any filenames named in its metadata.
#[derive(Debug)]
pub struct AnnotationStore<A: ObjectAccumulator> {
    /// Per-file stream groups in parse order.
    groups: Vec<A::Output>,
    /// URI -> indices into `groups`, ascending.
    uri_groups: BTreeMap<String, Vec<usize>>,
    streams: BTreeMap<LabelFileId, StreamRegistry>,
    metadata: BTreeMap<LabelFileId, LabelMetadata>,
    uri_to_streams: BTreeMap<String, LabelFileId>,
    degraded: Vec<(LabelFileId, String)>,
}

impl<A: ObjectAccumulator> Default for AnnotationStore<A> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            uri_groups: BTreeMap::new(),
            streams: BTreeMap::new(),
            metadata: BTreeMap::new(),
            uri_to_streams: BTreeMap::new(),
            degraded: Vec::new(),
        }
    }
}

impl<A: ObjectAccumulator> AnnotationStore<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one label file and returns every filename it may describe.
    ///
    /// Relative `label_path`s are resolved against `base_dir`; the label
    /// file id is derived from `label_path` as given. A file that cannot be
    /// read is an error and leaves the store untouched. A file that is not
    /// valid JSON is logged and treated as an empty document.
    pub fn parse_labels(
        &mut self,
        base_dir: &Path,
        label_path: &Path,
    ) -> Result<Vec<String>, OpenLabelError> {
        let abs_path = if label_path.is_absolute() {
            label_path.to_path_buf()
        } else {
            base_dir.join(label_path)
        };

        let bytes = fs::read(&abs_path).map_err(|source| OpenLabelError::LabelFileRead {
            path: abs_path.clone(),
            source,
        })?;

        let label_id = LabelFileId::from_path(label_path);
        let document = match serde_json::from_slice::<Value>(&bytes) {
            Ok(document) => document,
            Err(err) => {
                log::warn!(
                    "treating {} as an empty document: {err}",
                    abs_path.display()
                );
                self.degraded.push((label_id.clone(), err.to_string()));
                Value::Null
            }
        };

        Ok(self.parse_document(label_id, &document))
    }

    /// Parses a document held in a string. Invalid JSON is treated as an
    /// empty document.
    pub fn parse_labels_str(&mut self, label_id: impl Into<LabelFileId>, json: &str) -> Vec<String> {
        self.parse_labels_slice(label_id, json.as_bytes())
    }

    /// Parses a document held in a byte slice. Invalid JSON is treated as
    /// an empty document.
    pub fn parse_labels_slice(
        &mut self,
        label_id: impl Into<LabelFileId>,
        bytes: &[u8],
    ) -> Vec<String> {
        let label_id = label_id.into();
        let document = serde_json::from_slice::<Value>(bytes).unwrap_or_else(|err| {
            log::warn!("treating {label_id} as an empty document: {err}");
            self.degraded.push((label_id.clone(), err.to_string()));
            Value::Null
        });
        self.parse_document(label_id, &document)
    }

    /// Merges an already-decoded document, returning the filenames it may
    /// describe: the label file id, metadata filenames, then stream URIs.
    pub fn parse_document(&mut self, label_id: LabelFileId, document: &Value) -> Vec<String> {
        let empty = Map::new();
        let root = document
            .get("openlabel")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let metadata = LabelMetadata::from_value(root.get("metadata").unwrap_or(&Value::Null));
        let mut potential = vec![label_id.as_str().to_string()];
        potential.extend(metadata.potential_filenames());

        let mut registry = StreamRegistry::new();
        if let Some(streams) = root.get("streams").and_then(Value::as_object) {
            registry.add_streams(streams);
        }

        let mut accumulator = A::default();
        if let Some(objects) = root.get("objects").and_then(Value::as_object) {
            ingest_objects(&mut accumulator, objects, None);
        }
        if let Some(frames) = root.get("frames").and_then(Value::as_object) {
            for (frame, entry) in sorted_frames(frames) {
                if let Some(objects) = entry.get("objects").and_then(Value::as_object) {
                    ingest_objects(&mut accumulator, objects, Some(frame));
                }
                let frame_streams = entry
                    .get("frame_properties")
                    .and_then(|props| props.get("streams"))
                    .and_then(Value::as_object);
                if let Some(streams) = frame_streams {
                    registry.add_streams(streams);
                }
            }
        }

        self.store_groups(&accumulator, &registry, &potential);

        let uris: Vec<String> = registry.uris().map(str::to_string).collect();
        for uri in &uris {
            self.uri_to_streams.insert(uri.clone(), label_id.clone());
        }
        potential.extend(uris);

        self.streams.insert(label_id.clone(), registry);
        self.metadata.insert(label_id, metadata);
        potential
    }

    /// Keeps each stream group once and lists it under every URI it may
    /// describe.
    fn store_groups(&mut self, accumulator: &A, registry: &StreamRegistry, potential: &[String]) {
        for (stream, group) in accumulator.group_by_stream() {
            let mut targets: BTreeSet<&str> = potential.iter().map(String::as_str).collect();
            let stream_uri = stream
                .as_deref()
                .and_then(|name| registry.get(name))
                .and_then(|record| record.uri.as_deref());
            targets.extend(stream_uri);

            let index = self.groups.len();
            for uri in targets {
                self.uri_groups
                    .entry(uri.to_string())
                    .or_default()
                    .push(index);
            }
            self.groups.push(group);
        }
    }

    /// The merged collection for `uri`; empty if nothing names it.
    pub fn get_objects(&self, uri: &str) -> Cow<'_, A::Output> {
        match self.uri_groups.get(uri).map(Vec::as_slice) {
            Some(&[index]) => Cow::Borrowed(&self.groups[index]),
            Some(indices) => Cow::Owned(self.merge_groups(indices.iter().copied())),
            None => Cow::Owned(A::Output::default()),
        }
    }

    /// The merged collection for several names of the same media item. A
    /// group stored under more than one of the names is included once.
    pub fn get_objects_for<S: AsRef<str>>(&self, uris: &[S]) -> A::Output {
        let indices: BTreeSet<usize> = uris
            .iter()
            .filter_map(|uri| self.uri_groups.get(uri.as_ref()))
            .flatten()
            .copied()
            .collect();
        self.merge_groups(indices)
    }

    fn merge_groups(&self, indices: impl IntoIterator<Item = usize>) -> A::Output {
        let mut merged = A::Output::default();
        for index in indices {
            merged.merge(self.groups[index].clone());
        }
        merged
    }

    /// The stream describing `uri`, or a placeholder carrying only the URI.
    pub fn get_stream(&self, uri: &str) -> Cow<'_, StreamRecord> {
        self.uri_to_streams
            .get(uri)
            .and_then(|label_id| self.streams.get(label_id))
            .map(|registry| registry.get_one_stream(uri))
            .unwrap_or_else(|| Cow::Owned(StreamRecord::placeholder(uri)))
    }

    /// Every URI that has a collection.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.uri_groups.keys().map(String::as_str)
    }

    pub fn metadata(&self, label_id: &LabelFileId) -> Option<&LabelMetadata> {
        self.metadata.get(label_id)
    }

    pub fn streams(&self, label_id: &LabelFileId) -> Option<&StreamRegistry> {
        self.streams.get(label_id)
    }

    pub fn label_files(&self) -> impl Iterator<Item = &LabelFileId> {
        self.streams.keys()
    }

    /// Label files whose JSON could not be decoded, with the decode error.
    pub fn degraded_files(&self) -> &[(LabelFileId, String)] {
        &self.degraded
    }
}

fn ingest_objects<A: ObjectAccumulator>(
    accumulator: &mut A,
    objects: &Record,
    frame: Option<FrameNumber>,
) {
    for (id, record) in objects {
        let Some(record) = record.as_object() else {
            log::debug!("skipping non-object record for `{id}`");
            continue;
        };
        accumulator.ingest(&ObjectId::new(id.as_str()), record, frame);
    }
}

/// Frame entries in numeric order, as 1-based frame numbers.
fn sorted_frames(frames: &Record) -> Vec<(FrameNumber, &Value)> {
    let mut sorted: Vec<(FrameNumber, &Value)> = frames
        .iter()
        .filter_map(|(key, entry)| {
            let index = key.trim().parse::<FrameNumber>().ok();
            let number = index.and_then(|i| i.checked_add(1));
            if number.is_none() {
                log::warn!("skipping frame with non-numeric key `{key}`");
            }
            number.map(|n| (n, entry))
        })
        .collect();
    sorted.sort_by_key(|(number, _)| *number);
    sorted
}
