//! Merged object collections: the values an annotation store keeps per URI.

use std::collections::BTreeMap;
use std::fmt;

use super::ids::FrameNumber;
use super::object::GeometryObject;

/// A collection that per-URI maps can merge fragments into.
pub trait ObjectGroup: Clone + Default + fmt::Debug {
    /// Appends `other`, keeping every object it holds.
    fn merge(&mut self, other: Self);

    fn is_empty(&self) -> bool;

    /// Number of object snapshots held (per frame, for frame collections).
    fn object_count(&self) -> usize;

    /// One-line summary for listings.
    fn describe(&self) -> String;
}

/// Objects belonging to one image, in ingestion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectCollection {
    pub objects: Vec<GeometryObject>,
}

impl ObjectCollection {
    pub fn new(objects: Vec<GeometryObject>) -> Self {
        Self { objects }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeometryObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
}

impl ObjectGroup for ObjectCollection {
    fn merge(&mut self, other: Self) {
        self.objects.extend(other.objects);
    }

    fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn describe(&self) -> String {
        format!("{} object(s)", self.objects.len())
    }
}

/// Per-frame objects of one video. The `None` key holds objects that never
/// received a frame number.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameCollection {
    pub frames: BTreeMap<Option<FrameNumber>, ObjectCollection>,
}

impl FrameCollection {
    pub fn frame(&self, frame: FrameNumber) -> Option<&ObjectCollection> {
        self.frames.get(&Some(frame))
    }

    pub fn unframed(&self) -> Option<&ObjectCollection> {
        self.frames.get(&None)
    }

    /// Concrete frame numbers, ascending.
    pub fn frame_numbers(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.frames.keys().filter_map(|frame| *frame)
    }
}

impl ObjectGroup for FrameCollection {
    fn merge(&mut self, other: Self) {
        for (frame, objects) in other.frames {
            self.frames.entry(frame).or_default().merge(objects);
        }
    }

    fn is_empty(&self) -> bool {
        self.frames.values().all(ObjectGroup::is_empty)
    }

    fn object_count(&self) -> usize {
        self.frames.values().map(ObjectCollection::len).sum()
    }

    fn describe(&self) -> String {
        let mut summary = format!(
            "{} object snapshot(s) across {} frame(s)",
            self.object_count(),
            self.frame_numbers().count()
        );
        if let Some(unframed) = self.unframed() {
            summary.push_str(&format!(", {} unframed", unframed.len()));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str) -> GeometryObject {
        GeometryObject {
            id: id.into(),
            ..GeometryObject::default()
        }
    }

    #[test]
    fn frame_merge_extends_existing_frames() {
        let mut left = FrameCollection::default();
        left.frames
            .insert(Some(1), ObjectCollection::new(vec![object("a")]));

        let mut right = FrameCollection::default();
        right
            .frames
            .insert(Some(1), ObjectCollection::new(vec![object("b")]));
        right
            .frames
            .insert(None, ObjectCollection::new(vec![object("c")]));

        left.merge(right);

        assert_eq!(left.object_count(), 3);
        assert_eq!(left.frame(1).map(ObjectCollection::len), Some(2));
        assert_eq!(left.unframed().map(ObjectCollection::len), Some(1));
        assert_eq!(left.frame_numbers().collect::<Vec<_>>(), vec![1]);
        assert_eq!(
            left.describe(),
            "3 object snapshot(s) across 1 frame(s), 1 unframed"
        );
    }

    #[test]
    fn empty_collections_report_empty() {
        assert!(ObjectCollection::default().is_empty());
        assert!(FrameCollection::default().is_empty());
    }
}
