//! Fuzz target for OpenLABEL document parsing and label emission.
//!
//! Feeds arbitrary bytes through both stores, then emits labels for every
//! URI the document produced, checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use openlabel_import::labels::FrameSize;
use openlabel_import::openlabel::{
    ImageAnnotations, LabelKind, SegmentationStyle, VideoAnnotations,
};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let frame = FrameSize::new(64.0, 48.0);

    let mut images = ImageAnnotations::new();
    images.parse_labels_slice("fuzz", data);
    for uri in images.uris() {
        let _ = images
            .get_objects(uri)
            .to_labels(frame, &LabelKind::ALL, SegmentationStyle::InstanceMask);
    }

    let mut videos = VideoAnnotations::new();
    videos.parse_labels_slice("fuzz", data);
    for uri in videos.uris() {
        let _ = videos
            .get_objects(uri)
            .to_labels(frame, &LabelKind::ALL, SegmentationStyle::Polyline);
    }
});
