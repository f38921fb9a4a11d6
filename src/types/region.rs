//! Pixel regions for slice candidates.
//!
//! A `Region` is a normalized point set: pixels are kept sorted and
//! de-duplicated so that intersection and overlap counting are linear merges.
//! A cached bounding box lets disjoint regions short-circuit to zero.

use serde::{Deserialize, Serialize};

/// A single pixel coordinate.
///
/// Ordered by `(x, y)`; regions store their pixels in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pixel {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Pixel {
    /// Create a new pixel.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Pixel {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Inclusive axis-aligned bounding box of a non-empty region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Smallest column.
    pub min_x: i32,
    /// Smallest row.
    pub min_y: i32,
    /// Largest column.
    pub max_x: i32,
    /// Largest row.
    pub max_y: i32,
}

impl BoundingBox {
    /// Whether two boxes share at least one pixel position.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// An opaque 2D point set.
///
/// Invariant: `pixels` is strictly increasing, and `bounds` is `Some` exactly
/// when `pixels` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Pixel>", into = "Vec<Pixel>")]
pub struct Region {
    pixels: Vec<Pixel>,
    bounds: Option<BoundingBox>,
}

impl Region {
    /// Create an empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a region from arbitrary pixels (duplicates are collapsed).
    pub fn from_pixels<I>(pixels: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Pixel>,
    {
        let mut pixels: Vec<Pixel> = pixels.into_iter().map(Into::into).collect();
        pixels.sort_unstable();
        pixels.dedup();
        Self::from_sorted(pixels)
    }

    /// Axis-aligned filled rectangle with its top-left corner at `(x, y)`,
    /// clipped to the `i32` coordinate range.
    pub fn rectangle(x: i32, y: i32, width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::default();
        }
        let xs = x..=x.saturating_add_unsigned(width - 1);
        let ys = y..=y.saturating_add_unsigned(height - 1);

        let mut pixels = Vec::with_capacity(xs.clone().count() * ys.clone().count());
        for px in xs {
            for py in ys.clone() {
                pixels.push(Pixel::new(px, py));
            }
        }
        Self::from_sorted(pixels)
    }

    fn from_sorted(pixels: Vec<Pixel>) -> Self {
        debug_assert!(pixels.windows(2).all(|w| w[0] < w[1]));

        let bounds = match (pixels.first(), pixels.last()) {
            (Some(first), Some(last)) => {
                let (min_y, max_y) = pixels
                    .iter()
                    .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
                Some(BoundingBox {
                    min_x: first.x,
                    min_y,
                    max_x: last.x,
                    max_y,
                })
            }
            _ => None,
        };

        Self { pixels, bounds }
    }

    /// Number of pixels.
    pub fn size(&self) -> usize {
        self.pixels.len()
    }

    /// Whether the region has no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixels in ascending `(x, y)` order.
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Bounding box, `None` for an empty region.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Membership test.
    pub fn contains(&self, pixel: Pixel) -> bool {
        self.pixels.binary_search(&pixel).is_ok()
    }

    /// Mean pixel position, `None` for an empty region.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.pixels.is_empty() {
            return None;
        }
        let n = self.pixels.len() as f64;
        let (sx, sy) = self
            .pixels
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
        Some((sx / n, sy / n))
    }

    fn may_overlap(&self, other: &Region) -> bool {
        match (self.bounds, other.bounds) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }

    /// Geometric intersection of two regions.
    pub fn intersection(&self, other: &Region) -> Region {
        if !self.may_overlap(other) {
            return Region::new();
        }

        let mut shared = Vec::with_capacity(self.size().min(other.size()));
        let (mut i, mut j) = (0, 0);
        while i < self.pixels.len() && j < other.pixels.len() {
            match self.pixels[i].cmp(&other.pixels[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared.push(self.pixels[i]);
                    i += 1;
                    j += 1;
                }
            }
        }

        Self::from_sorted(shared)
    }

    /// Number of pixels shared with `other`, without materializing them.
    pub fn overlap_size(&self, other: &Region) -> usize {
        if !self.may_overlap(other) {
            return 0;
        }

        let (mut i, mut j, mut count) = (0, 0, 0);
        while i < self.pixels.len() && j < other.pixels.len() {
            match self.pixels[i].cmp(&other.pixels[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }

    /// Copy of this region shifted by `(dx, dy)`. Pixels pushed outside
    /// the `i32` coordinate range are dropped.
    pub fn translated(&self, dx: i32, dy: i32) -> Region {
        // A uniform shift preserves the (x, y) ordering.
        let pixels = self
            .pixels
            .iter()
            .filter_map(|p| Some(Pixel::new(p.x.checked_add(dx)?, p.y.checked_add(dy)?)))
            .collect();
        Self::from_sorted(pixels)
    }
}

impl From<Vec<Pixel>> for Region {
    fn from(pixels: Vec<Pixel>) -> Self {
        Self::from_pixels(pixels)
    }
}

impl From<Region> for Vec<Pixel> {
    fn from(region: Region) -> Self {
        region.pixels
    }
}

impl FromIterator<Pixel> for Region {
    fn from_iter<T: IntoIterator<Item = Pixel>>(iter: T) -> Self {
        Self::from_pixels(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pixels_normalizes() {
        let region = Region::from_pixels([(2, 1), (0, 0), (2, 1), (1, 5)]);

        assert_eq!(region.size(), 3);
        assert_eq!(region.pixels()[0], Pixel::new(0, 0));
        let bounds = region.bounds().unwrap();
        assert_eq!((bounds.min_x, bounds.max_x), (0, 2));
        assert_eq!((bounds.min_y, bounds.max_y), (0, 5));
    }

    #[test]
    fn test_rectangle_intersection() {
        // 10x10 at origin and 10x10 shifted by (5, 5) share a 5x5 block
        let a = Region::rectangle(0, 0, 10, 10);
        let b = Region::rectangle(5, 5, 10, 10);

        let shared = a.intersection(&b);
        assert_eq!(shared.size(), 25);
        assert_eq!(a.overlap_size(&b), 25);
        assert_eq!(b.overlap_size(&a), 25);
        assert!(shared.contains(Pixel::new(9, 9)));
        assert!(!shared.contains(Pixel::new(4, 9)));
    }

    #[test]
    fn test_disjoint_bounds_short_circuit() {
        let a = Region::rectangle(0, 0, 3, 3);
        let b = Region::rectangle(100, 100, 3, 3);

        assert_eq!(a.overlap_size(&b), 0);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn test_empty_region() {
        let empty = Region::new();
        let a = Region::rectangle(0, 0, 4, 4);

        assert!(empty.bounds().is_none());
        assert!(empty.center().is_none());
        assert_eq!(empty.overlap_size(&a), 0);
        assert_eq!(a.overlap_size(&empty), 0);
        assert!(a.intersection(&empty).is_empty());
    }

    #[test]
    fn test_center_and_translation() {
        let a = Region::rectangle(0, 0, 3, 3);
        assert_eq!(a.center(), Some((1.0, 1.0)));

        let moved = a.translated(10, -2);
        assert_eq!(moved.size(), 9);
        assert_eq!(moved.center(), Some((11.0, -1.0)));
        assert!(moved.contains(Pixel::new(12, 0)));
    }

    #[test]
    fn test_rectangle_clips_at_coordinate_limit() {
        let edge = Region::rectangle(i32::MAX - 1, 0, 5, 1);
        assert_eq!(edge.size(), 2);
        assert!(edge.contains(Pixel::new(i32::MAX, 0)));

        assert!(Region::rectangle(0, 0, 0, 3).is_empty());
    }

    #[test]
    fn test_translation_drops_pixels_leaving_range() {
        let a = Region::from_pixels([(i32::MAX - 1, 0), (i32::MAX, 0)]);

        let moved = a.translated(1, 0);

        assert_eq!(moved.pixels(), &[Pixel::new(i32::MAX, 0)]);
        assert!(a.translated(0, i32::MIN).contains(Pixel::new(i32::MAX, i32::MIN)));
    }

    #[test]
    fn test_deserialize_normalizes() {
        let region: Region = serde_json::from_str(
            r#"[{"x":1,"y":1},{"x":0,"y":0},{"x":1,"y":1}]"#,
        )
        .unwrap();

        assert_eq!(region.size(), 2);
        assert_eq!(region.pixels()[1], Pixel::new(1, 1));
    }
}
