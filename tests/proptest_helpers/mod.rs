#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use serde_json::{json, Value};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A pixel box `[cx, cy, w, h]` lying fully inside a `width` x `height`
/// frame.
pub fn arb_bbox_in(width: u32, height: u32) -> BoxedStrategy<[f64; 4]> {
    (1..=width, 1..=height)
        .prop_flat_map(move |(w, h)| {
            (0..=(width - w), 0..=(height - h)).prop_map(move |(x, y)| {
                [
                    x as f64 + w as f64 / 2.0,
                    y as f64 + h as f64 / 2.0,
                    w as f64,
                    h as f64,
                ]
            })
        })
        .boxed()
}

/// An object record contributing the given boxes and one `rank` attribute.
pub fn bbox_record(boxes: &[[f64; 4]], rank: i64) -> Value {
    let entries: Vec<Value> = boxes.iter().map(|b| json!({"val": b})).collect();
    json!({
        "type": "car",
        "object_data": {"bbox": entries},
        "attributes": {"num": [{"name": "rank", "val": rank}]}
    })
}
