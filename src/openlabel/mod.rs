//! OpenLABEL parsing and merging.
//!
//! OpenLABEL documents describe a graph of objects, camera streams and
//! frames, and a single logical object is often spread over several
//! records: a top-level definition, per-frame geometry, even several label
//! files. This module merges those fragments by object id and hands back
//! one collection per media URI.
//!
//! ```
//! use openlabel_import::labels::FrameSize;
//! use openlabel_import::openlabel::{ImageAnnotations, LabelKind, SegmentationStyle};
//!
//! let json = r#"{"openlabel": {
//!     "metadata": {"uri": "img.png"},
//!     "objects": {"o1": {"type": "car", "object_data": {"bbox": [{"val": [50, 50, 20, 10]}]}}}
//! }}"#;
//!
//! let mut store = ImageAnnotations::new();
//! store.parse_labels_str("labels/img", json);
//!
//! let labels = store.get_objects("img.png").to_labels(
//!     FrameSize::new(100.0, 100.0),
//!     &[LabelKind::Detections],
//!     SegmentationStyle::default(),
//! );
//! assert_eq!(labels.label_count(), 1);
//! ```

pub mod accumulator;
pub mod attributes;
pub mod collection;
mod emit;
mod ids;
mod kinds;
mod metadata;
mod object;
mod store;
mod stream;
mod value;

pub use accumulator::{FlatAccumulator, FrameAccumulator, IdentityIndex, ObjectAccumulator};
pub use collection::{FrameCollection, ObjectCollection, ObjectGroup};
pub use emit::FrameLabels;
pub use ids::{FrameNumber, LabelFileId, ObjectId};
pub use kinds::{parse_label_kinds, LabelKind, MediaKind, SegmentationStyle};
pub use metadata::{LabelMetadata, SegmentationHint};
pub use object::{GeometryObject, OBJECT_ID_ATTRIBUTE};
pub use store::{AnnotationStore, ImageAnnotations, VideoAnnotations};
pub use stream::{StreamRecord, StreamRegistry, CAMERA_STREAM_TYPE};
pub use value::{AttributeValue, Attributes};
