//! Per-file object accumulation.
//!
//! An accumulator ingests every object record of one label file, merging
//! records that share an id, and remembers which stream each object belongs
//! to. The store then asks it for one collection per stream.

use std::collections::{BTreeMap, BTreeSet};

use super::attributes::Record;
use super::collection::{FrameCollection, ObjectCollection, ObjectGroup};
use super::ids::{FrameNumber, ObjectId};
use super::object::{GeometryObject, ParsedRecord};

/// Merges raw object records by id.
///
/// Implementations differ only in how snapshots are keyed: one per id, or
/// one per `(frame, id)`.
pub trait ObjectAccumulator: Default {
    type Output: ObjectGroup;

    /// Folds one raw record into the object `id`. `frame` is the 1-based
    /// number of the enclosing `frames` entry, if any.
    fn ingest(&mut self, id: &ObjectId, record: &Record, frame: Option<FrameNumber>);

    fn identities(&self) -> &IdentityIndex;

    /// The collection holding `ids`, in that order.
    fn collect(&self, ids: &[ObjectId]) -> Self::Output;

    /// One collection per stream that owns at least one object, then one
    /// keyed by `None` for objects with no stream. Empty groups are skipped.
    fn group_by_stream(&self) -> Vec<(Option<String>, Self::Output)> {
        let identities = self.identities();
        let mut groups: Vec<(Option<String>, Self::Output)> = identities
            .by_stream()
            .map(|(stream, ids)| (Some(stream.to_string()), self.collect(ids)))
            .collect();
        if !identities.streamless().is_empty() {
            groups.push((None, self.collect(identities.streamless())));
        }
        groups.retain(|(_, group)| !group.is_empty());
        groups
    }
}

/// Which object ids belong to which stream.
///
/// An id lives either in exactly one streamless slot or in the lists of the
/// streams it was seen with; once it resolves to a stream it leaves the
/// streamless set for good.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdentityIndex {
    by_stream: BTreeMap<String, Vec<ObjectId>>,
    streamless: Vec<ObjectId>,
}

impl IdentityIndex {
    pub fn record(&mut self, id: &ObjectId, stream: Option<&str>) {
        match stream {
            Some(stream) => {
                self.streamless.retain(|existing| existing != id);
                let ids = self.by_stream.entry(stream.to_string()).or_default();
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
            None => {
                let placed = self.by_stream.values().any(|ids| ids.contains(id))
                    || self.streamless.contains(id);
                if !placed {
                    self.streamless.push(id.clone());
                }
            }
        }
    }

    pub fn by_stream(&self) -> impl Iterator<Item = (&str, &[ObjectId])> {
        self.by_stream
            .iter()
            .map(|(stream, ids)| (stream.as_str(), ids.as_slice()))
    }

    pub fn streamless(&self) -> &[ObjectId] {
        &self.streamless
    }
}

/// One object per id. Frame numbers are ignored, so frame records merge
/// into the same object as top-level ones.
#[derive(Clone, Debug, Default)]
pub struct FlatAccumulator {
    objects: BTreeMap<ObjectId, GeometryObject>,
    identities: IdentityIndex,
}

impl FlatAccumulator {
    pub fn get(&self, id: &str) -> Option<&GeometryObject> {
        self.objects.get(id)
    }
}

impl ObjectAccumulator for FlatAccumulator {
    type Output = ObjectCollection;

    fn ingest(&mut self, id: &ObjectId, record: &Record, _frame: Option<FrameNumber>) {
        let parsed = ParsedRecord::parse(record);
        if let Some(existing) = self.objects.get_mut(id) {
            existing.merge(parsed);
        } else {
            self.objects
                .insert(id.clone(), GeometryObject::from_parsed(id.clone(), parsed));
        }
        let stream = self.objects.get(id).and_then(|o| o.stream.clone());
        self.identities.record(id, stream.as_deref());
    }

    fn identities(&self) -> &IdentityIndex {
        &self.identities
    }

    fn collect(&self, ids: &[ObjectId]) -> ObjectCollection {
        ObjectCollection::new(
            ids.iter()
                .filter_map(|id| self.objects.get(id))
                .cloned()
                .collect(),
        )
    }
}

/// Independent snapshots per `(frame, id)`.
///
/// Top-level records (no enclosing frame) build a frame-agnostic definition.
/// An object with no frame numbers at all sits in the `None` bucket; as soon
/// as it resolves to concrete frames it moves out of that bucket, each new
/// frame snapshot starting from the frame-agnostic definition.
#[derive(Clone, Debug, Default)]
pub struct FrameAccumulator {
    frames: BTreeMap<Option<FrameNumber>, BTreeMap<ObjectId, GeometryObject>>,
    agnostic: BTreeMap<ObjectId, GeometryObject>,
    identities: IdentityIndex,
}

impl FrameAccumulator {
    pub fn get(&self, frame: Option<FrameNumber>, id: &str) -> Option<&GeometryObject> {
        self.frames.get(&frame).and_then(|bucket| bucket.get(id))
    }

    /// Frame keys currently holding snapshots, ascending with `None` first.
    pub fn frame_keys(&self) -> impl Iterator<Item = Option<FrameNumber>> + '_ {
        self.frames.keys().copied()
    }

    fn merge_agnostic(&mut self, id: &ObjectId, parsed: ParsedRecord) -> &GeometryObject {
        if let Some(existing) = self.agnostic.get_mut(id) {
            existing.merge(parsed);
        } else {
            self.agnostic
                .insert(id.clone(), GeometryObject::from_parsed(id.clone(), parsed));
        }
        &self.agnostic[id]
    }
}

impl ObjectAccumulator for FrameAccumulator {
    type Output = FrameCollection;

    fn ingest(&mut self, id: &ObjectId, record: &Record, frame: Option<FrameNumber>) {
        let mut parsed = ParsedRecord::parse(record);
        let mut targets: BTreeSet<FrameNumber> =
            std::mem::take(&mut parsed.frame_numbers).into_iter().collect();
        targets.extend(frame);

        let mut stream = None;

        if frame.is_none() {
            let definition = self.merge_agnostic(id, parsed.clone()).clone();
            if targets.is_empty() {
                stream = definition.stream.clone();
                self.frames
                    .entry(None)
                    .or_default()
                    .insert(id.clone(), definition);
                self.identities.record(id, stream.as_deref());
                return;
            }
        }

        for target in &targets {
            let bucket = self.frames.entry(Some(*target)).or_default();
            if let Some(existing) = bucket.get_mut(id) {
                existing.merge(parsed.clone());
                if stream.is_none() {
                    stream = existing.stream.clone();
                }
                continue;
            }

            // Interval frames copy the whole definition. A frame record
            // outside the intervals inherits only the identity.
            let snapshot = match (self.agnostic.get(id), frame) {
                (Some(definition), None) => definition.clone(),
                (Some(definition), Some(_)) => {
                    let mut snapshot = definition.identity();
                    snapshot.merge(parsed.clone());
                    snapshot
                }
                (None, _) => GeometryObject::from_parsed(id.clone(), parsed.clone()),
            };
            if stream.is_none() {
                stream = snapshot.stream.clone();
            }
            bucket.insert(id.clone(), snapshot);
        }

        if let Some(unframed) = self.frames.get_mut(&None) {
            unframed.remove(id);
            if unframed.is_empty() {
                self.frames.remove(&None);
            }
        }

        self.identities.record(id, stream.as_deref());
    }

    fn identities(&self) -> &IdentityIndex {
        &self.identities
    }

    fn collect(&self, ids: &[ObjectId]) -> FrameCollection {
        let frames = self
            .frames
            .iter()
            .filter_map(|(frame, bucket)| {
                let objects: Vec<GeometryObject> =
                    ids.iter().filter_map(|id| bucket.get(id)).cloned().collect();
                (!objects.is_empty()).then(|| (*frame, ObjectCollection::new(objects)))
            })
            .collect();
        FrameCollection { frames }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().expect("object literal")
    }

    fn id(value: &str) -> ObjectId {
        ObjectId::new(value)
    }

    #[test]
    fn streamless_object_migrates_once() {
        let mut acc = FlatAccumulator::default();
        acc.ingest(&id("o1"), &record(json!({"type": "car"})), None);
        assert_eq!(acc.identities().streamless(), &[id("o1")]);

        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [1, 1, 1, 1], "stream": "cam0"}]}})),
            None,
        );
        acc.ingest(&id("o1"), &record(json!({})), None);

        let groups = acc.group_by_stream();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0.as_deref(), Some("cam0"));
        assert_eq!(groups[0].1.len(), 1);
        assert!(acc.identities().streamless().is_empty());
    }

    #[test]
    fn streamless_ids_are_not_duplicated() {
        let mut acc = FlatAccumulator::default();
        acc.ingest(&id("o1"), &record(json!({})), None);
        acc.ingest(&id("o1"), &record(json!({})), Some(3));

        let groups = acc.group_by_stream();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, None);
        assert_eq!(groups[0].1.len(), 1);
    }

    #[test]
    fn flat_accumulator_merges_frame_records() {
        let mut acc = FlatAccumulator::default();
        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [1, 1, 1, 1]}]}})),
            None,
        );
        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [2, 2, 2, 2]}]}})),
            Some(1),
        );
        assert_eq!(acc.get("o1").map(|o| o.bboxes.len()), Some(2));
    }

    #[test]
    fn frame_intervals_move_object_out_of_agnostic_bucket() {
        let mut acc = FrameAccumulator::default();
        acc.ingest(&id("o1"), &record(json!({"type": "car"})), None);
        assert!(acc.get(None, "o1").is_some());

        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [1, 1, 1, 1]}]}})),
            Some(2),
        );

        assert!(acc.get(None, "o1").is_none());
        assert_eq!(acc.frame_keys().collect::<Vec<_>>(), vec![Some(2)]);
        let snapshot = acc.get(Some(2), "o1").expect("frame 2 snapshot");
        assert_eq!(snapshot.object_type.as_deref(), Some("car"));
        assert_eq!(snapshot.bboxes.len(), 1);
    }

    #[test]
    fn top_level_intervals_seed_every_frame() {
        let mut acc = FrameAccumulator::default();
        acc.ingest(
            &id("o1"),
            &record(json!({
                "type": "ped",
                "frame_intervals": [{"frame_start": 0, "frame_end": 2}]
            })),
            None,
        );
        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [5, 5, 2, 2]}]}})),
            Some(2),
        );

        assert_eq!(
            acc.frame_keys().collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3)]
        );
        for frame in 1..=3 {
            let snapshot = acc.get(Some(frame), "o1").expect("snapshot");
            assert_eq!(snapshot.object_type.as_deref(), Some("ped"));
        }
        assert_eq!(acc.get(Some(2), "o1").map(|o| o.bboxes.len()), Some(1));
        assert_eq!(acc.get(Some(3), "o1").map(|o| o.bboxes.len()), Some(0));
    }

    #[test]
    fn frame_records_inherit_identity_but_not_agnostic_geometry() {
        let mut acc = FrameAccumulator::default();
        acc.ingest(
            &id("o1"),
            &record(json!({
                "name": "lead",
                "type": "car",
                "object_data": {"bbox": [{"val": [1, 1, 1, 1], "stream": "cam0"}]},
                "attributes": {"text": [{"name": "color", "val": "red"}]}
            })),
            None,
        );
        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [9, 9, 2, 2]}]}})),
            Some(3),
        );

        let snapshot = acc.get(Some(3), "o1").expect("frame 3 snapshot");
        assert_eq!(snapshot.bboxes, vec![[9.0, 9.0, 2.0, 2.0]]);
        assert_eq!(snapshot.name.as_deref(), Some("lead"));
        assert_eq!(snapshot.object_type.as_deref(), Some("car"));
        assert_eq!(snapshot.stream.as_deref(), Some("cam0"));
        assert!(snapshot.attributes.is_empty());
    }

    #[test]
    fn frame_snapshots_are_independent() {
        let mut acc = FrameAccumulator::default();
        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [1, 1, 1, 1]}]}})),
            Some(1),
        );
        acc.ingest(
            &id("o1"),
            &record(json!({"object_data": {"bbox": [{"val": [2, 2, 2, 2]}]}})),
            Some(2),
        );

        assert_eq!(acc.get(Some(1), "o1").map(|o| o.bboxes.clone()), Some(vec![[1.0; 4]]));
        assert_eq!(acc.get(Some(2), "o1").map(|o| o.bboxes.clone()), Some(vec![[2.0; 4]]));
    }

    #[test]
    fn frame_collection_groups_by_stream() {
        let mut acc = FrameAccumulator::default();
        acc.ingest(
            &id("a"),
            &record(json!({"object_data": {"bbox": [{"val": [1, 1, 1, 1], "stream": "cam0"}]}})),
            Some(1),
        );
        acc.ingest(&id("b"), &record(json!({})), Some(1));

        let groups = acc.group_by_stream();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.as_deref(), Some("cam0"));
        assert_eq!(groups[0].1.frame(1).map(ObjectCollection::len), Some(1));
        assert_eq!(groups[1].0, None);
        assert_eq!(groups[1].1.object_count(), 1);
    }
}
