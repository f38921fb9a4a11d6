//! Slice candidates.
//!
//! A slice is one region hypothesis for one section. Its identity (`id`,
//! `section`) is fixed at construction; only the region can change, and only
//! by intersection with another slice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::region::Region;

/// Unique identifier of a slice.
///
/// Also the variable index of the slice in synthesized linear constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceId(u32);

impl SliceId {
    /// Create a new slice id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SliceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A 2D region candidate at one section of the stack.
///
/// The region is held behind an `Arc`, so cloning a slice is cheap and
/// clones share pixel storage until one of them is intersected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slice {
    id: SliceId,
    section: u32,
    region: Arc<Region>,
}

impl Slice {
    /// Create a new slice.
    pub fn new(id: SliceId, section: u32, region: Region) -> Self {
        Self {
            id,
            section,
            region: Arc::new(region),
        }
    }

    /// The slice id.
    pub fn id(&self) -> SliceId {
        self.id
    }

    /// The section (time index) this slice belongs to.
    pub fn section(&self) -> u32 {
        self.section
    }

    /// The current region.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Number of pixels in the current region.
    pub fn size(&self) -> usize {
        self.region.size()
    }

    /// Replace the region with its intersection with `other`'s region.
    ///
    /// Installs a fresh region; storage shared with clones is left untouched.
    pub fn intersect(&mut self, other: &Slice) {
        self.region = Arc::new(self.region.intersection(&other.region));
    }

    /// Replace the region with its intersection with a bare region.
    pub(crate) fn intersect_region(&mut self, other: &Region) {
        self.region = Arc::new(self.region.intersection(other));
    }

    /// Shared handle to the current region.
    pub(crate) fn region_handle(&self) -> Arc<Region> {
        Arc::clone(&self.region)
    }
}

impl PartialEq for Slice {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.section == other.section && self.region == other.region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect_replaces_region() {
        let mut a = Slice::new(SliceId::new(1), 0, Region::rectangle(0, 0, 10, 10));
        let b = Slice::new(SliceId::new(2), 0, Region::rectangle(5, 0, 10, 10));

        a.intersect(&b);

        assert_eq!(a.size(), 50);
        assert_eq!(a.id(), SliceId::new(1));
        assert_eq!(a.section(), 0);
        // other side is untouched
        assert_eq!(b.size(), 100);
    }

    #[test]
    fn test_intersect_is_copy_on_write() {
        let original = Slice::new(SliceId::new(1), 3, Region::rectangle(0, 0, 4, 4));
        let mut refined = original.clone();
        let cutter = Slice::new(SliceId::new(2), 3, Region::rectangle(0, 0, 2, 4));

        refined.intersect(&cutter);

        assert_eq!(refined.size(), 8);
        assert_eq!(original.size(), 16);
    }

    #[test]
    fn test_slice_id_serializes_transparently() {
        let json = serde_json::to_string(&SliceId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
