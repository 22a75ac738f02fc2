//! Dense binary masks and polyline rasterization.

use serde::ser::{Serialize, Serializer};

use super::bbox::BBoxXYXY;
use super::coord::Coord;
use super::space::{FrameSize, Normalized};

/// A row-major binary mask.
///
/// Serializes as `{"size": [height, width], "counts": [...]}` where `counts`
/// are alternating run lengths over the row-major pixels, starting with a
/// run of unset pixels (possibly zero).
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

/// Largest mask, in pixels, that `Mask::new` will allocate.
pub const MAX_MASK_PIXELS: usize = 1 << 28;

impl Mask {
    /// An empty mask, or `None` when `width * height` exceeds
    /// [`MAX_MASK_PIXELS`].
    pub fn new(width: usize, height: usize) -> Option<Self> {
        let pixels = width
            .checked_mul(height)
            .filter(|&pixels| pixels <= MAX_MASK_PIXELS)?;
        Some(Self {
            width,
            height,
            data: vec![false; pixels],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x]
    }

    /// Sets a pixel; out-of-range coordinates are ignored.
    pub fn set(&mut self, x: i64, y: i64) {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return;
        };
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = true;
        }
    }

    /// Number of set pixels.
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&px| px).count()
    }

    pub fn run_lengths(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        let mut current = false;
        let mut run = 0;
        for &px in &self.data {
            if px != current {
                counts.push(run);
                run = 0;
                current = px;
            }
            run += 1;
        }
        counts.push(run);
        counts
    }
}

impl std::fmt::Debug for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("area", &self.area())
            .finish()
    }
}

impl Serialize for Mask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Rle {
            size: [usize; 2],
            counts: Vec<usize>,
        }
        Rle {
            size: [self.height, self.width],
            counts: self.run_lengths(),
        }
        .serialize(serializer)
    }
}

/// Rasterizes relative polyline rings at frame resolution.
///
/// The mask covers the rings' bounding box (clamped to the unit square) and
/// that box is returned alongside it. Filled shapes use even-odd filling
/// sampled at pixel centers; unfilled ones draw their outline, including the
/// closing edge when `closed`. Returns `None` for empty geometry or an empty
/// frame. A crop larger than [`MAX_MASK_PIXELS`] keeps its box but gets no
/// mask.
pub fn rasterize(
    rings: &[Vec<Coord<Normalized>>],
    frame: FrameSize,
    filled: bool,
    closed: bool,
) -> Option<(BBoxXYXY<Normalized>, Option<Mask>)> {
    let bbox = BBoxXYXY::enclosing(rings.iter().flatten().copied())?.clamped();
    let (grid_w, grid_h) = frame.pixel_grid();
    if grid_w == 0 || grid_h == 0 {
        return None;
    }

    let (x0, x1) = crop_span(bbox.xmin(), bbox.xmax(), grid_w);
    let (y0, y1) = crop_span(bbox.ymin(), bbox.ymax(), grid_h);
    let Some(mut mask) = Mask::new(x1 - x0, y1 - y0) else {
        log::debug!(
            "skipping {}x{} mask at frame {frame}: too large",
            x1 - x0,
            y1 - y0
        );
        return Some((bbox, None));
    };

    let local: Vec<Vec<(f64, f64)>> = rings
        .iter()
        .map(|ring| {
            ring.iter()
                .map(|p| {
                    (
                        p.x * grid_w as f64 - x0 as f64,
                        p.y * grid_h as f64 - y0 as f64,
                    )
                })
                .collect()
        })
        .collect();

    if filled {
        fill_even_odd(&mut mask, &local);
    } else {
        for ring in &local {
            draw_outline(&mut mask, ring, closed);
        }
    }

    Some((bbox, Some(mask)))
}

/// Pixel range `[start, end)` covering the relative span, at least one
/// pixel wide and inside the grid.
fn crop_span(min: f64, max: f64, grid: usize) -> (usize, usize) {
    let start = ((min * grid as f64).floor().max(0.0) as usize).min(grid - 1);
    let end = ((max * grid as f64).ceil().max(0.0) as usize).clamp(start + 1, grid);
    (start, end)
}

fn fill_even_odd(mask: &mut Mask, rings: &[Vec<(f64, f64)>]) {
    let mut crossings = Vec::new();
    for row in 0..mask.height() {
        let yc = row as f64 + 0.5;
        crossings.clear();

        for ring in rings {
            let n = ring.len();
            for i in 0..n {
                let (xa, ya) = ring[i];
                let (xb, yb) = ring[(i + 1) % n];
                if (ya <= yc) != (yb <= yc) {
                    crossings.push(xa + (yc - ya) * (xb - xa) / (yb - ya));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil() as i64;
            let end = (pair[1] - 0.5).ceil() as i64;
            for x in start.max(0)..end.min(mask.width() as i64) {
                mask.set(x, row as i64);
            }
        }
    }
}

fn draw_outline(mask: &mut Mask, ring: &[(f64, f64)], closed: bool) {
    let max_x = mask.width() as i64 - 1;
    let max_y = mask.height() as i64 - 1;
    let to_px = |(x, y): (f64, f64)| {
        (
            (x.floor() as i64).clamp(0, max_x),
            (y.floor() as i64).clamp(0, max_y),
        )
    };

    let points: Vec<(i64, i64)> = ring.iter().copied().map(to_px).collect();
    match points.as_slice() {
        [] => {}
        [only] => mask.set(only.0, only.1),
        _ => {
            for segment in points.windows(2) {
                draw_line(mask, segment[0], segment[1]);
            }
            if closed {
                if let (Some(&last), Some(&first)) = (points.last(), points.first()) {
                    draw_line(mask, last, first);
                }
            }
        }
    }
}

/// Bresenham line between two pixels, endpoints included.
fn draw_line(mask: &mut Mask, (mut x, mut y): (i64, i64), (x1, y1): (i64, i64)) {
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        mask.set(x, y);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<Normalized>> {
        points.iter().copied().map(Coord::from).collect()
    }

    #[test]
    fn filled_square_covers_frame() {
        let rings = vec![ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])];
        let (bbox, mask) = rasterize(&rings, FrameSize::new(10.0, 10.0), true, true).expect("box");
        let mask = mask.expect("mask");

        assert_eq!(bbox.to_xywh(), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!((mask.width(), mask.height()), (10, 10));
        assert_eq!(mask.area(), 100);
    }

    #[test]
    fn filled_triangle_is_cropped_to_its_box() {
        let rings = vec![ring(&[(0.5, 0.5), (1.0, 0.5), (0.5, 1.0)])];
        let (_, mask) = rasterize(&rings, FrameSize::new(20.0, 20.0), true, true).expect("box");
        let mask = mask.expect("mask");

        assert_eq!((mask.width(), mask.height()), (10, 10));
        // Pixel centers strictly inside x + y < 10 in the crop.
        assert_eq!(mask.area(), (1..=9).sum::<usize>());
        assert!(mask.get(0, 8));
        assert!(mask.get(8, 0));
        assert!(!mask.get(0, 9));
        assert!(!mask.get(9, 0));
    }

    #[test]
    fn unfilled_open_outline_skips_closing_edge() {
        let points = [(0.0, 0.0), (0.9, 0.0), (0.9, 0.9)];
        let open = rasterize(&[ring(&points)], FrameSize::new(10.0, 10.0), false, false)
            .and_then(|(_, mask)| mask)
            .expect("open mask");
        let closed = rasterize(&[ring(&points)], FrameSize::new(10.0, 10.0), false, true)
            .and_then(|(_, mask)| mask)
            .expect("closed mask");

        assert!(!open.get(4, 4));
        assert!(closed.get(4, 4));
        assert!(closed.area() > open.area());
    }

    #[test]
    fn empty_geometry_has_no_mask() {
        assert!(rasterize(&[], FrameSize::new(10.0, 10.0), true, true).is_none());
        let rings = vec![ring(&[(0.1, 0.1), (0.2, 0.2)])];
        assert!(rasterize(&rings, FrameSize::new(0.0, 10.0), true, true).is_none());
    }

    #[test]
    fn huge_frames_keep_the_box_without_a_mask() {
        let rings = vec![ring(&[(0.1, 0.1), (0.9, 0.1), (0.9, 0.9), (0.1, 0.9)])];
        let (bbox, mask) =
            rasterize(&rings, FrameSize::new(1e10, 1e10), true, true).expect("box");

        assert!(mask.is_none());
        let [x, y, w, h] = bbox.to_xywh();
        assert!((x - 0.1).abs() < 1e-9 && (y - 0.1).abs() < 1e-9);
        assert!((w - 0.8).abs() < 1e-9 && (h - 0.8).abs() < 1e-9);
    }

    #[test]
    fn oversized_masks_are_refused() {
        assert!(Mask::new(usize::MAX, 2).is_none());
        assert!(Mask::new(MAX_MASK_PIXELS, 2).is_none());
        assert!(Mask::new(MAX_MASK_PIXELS + 1, 1).is_none());
    }

    #[test]
    fn mask_serializes_as_run_lengths() {
        let mut mask = Mask::new(3, 2).expect("mask");
        mask.set(1, 0);
        mask.set(2, 0);
        mask.set(0, 1);
        let json = serde_json::to_string(&mask).expect("serialize mask");
        assert_eq!(json, r#"{"size":[2,3],"counts":[1,3,2]}"#);
    }
}
