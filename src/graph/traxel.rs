//! Per-node feature records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Slice;

/// Feature name for the pixel count of a traxel's region.
pub const FEATURE_COUNT: &str = "count";

/// Feature name for the region centroid `[x, y]`.
pub const FEATURE_COM: &str = "com";

/// A tracking hypothesis' feature record.
///
/// Features are computed outside the graph; the graph stores them opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traxel {
    /// Object id within its timestep.
    pub id: u32,
    /// Timestep the object was observed at.
    pub timestep: i32,
    /// Named feature vectors, sorted by name.
    pub features: BTreeMap<String, Vec<f32>>,
}

impl Traxel {
    /// Create a traxel without features.
    pub fn new(id: u32, timestep: i32) -> Self {
        Self {
            id,
            timestep,
            features: BTreeMap::new(),
        }
    }

    /// Builder: add or replace a feature vector.
    pub fn with_feature(mut self, name: impl Into<String>, values: Vec<f32>) -> Self {
        self.features.insert(name.into(), values);
        self
    }

    /// Feature vector `name`.
    pub fn feature(&self, name: &str) -> Option<&[f32]> {
        self.features.get(name).map(Vec::as_slice)
    }

    /// Traxel for a consolidated slice, with size and centroid features.
    pub fn from_slice(slice: &Slice, timestep: i32) -> Self {
        let mut traxel = Self::new(slice.id().get(), timestep)
            .with_feature(FEATURE_COUNT, vec![slice.size() as f32]);
        if let Some((x, y)) = slice.region().center() {
            traxel = traxel.with_feature(FEATURE_COM, vec![x as f32, y as f32]);
        }
        traxel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Region, SliceId};

    #[test]
    fn test_from_slice() {
        let slice = Slice::new(SliceId::new(7), 0, Region::rectangle(0, 0, 3, 2));
        let traxel = Traxel::from_slice(&slice, 4);

        assert_eq!(traxel.id, 7);
        assert_eq!(traxel.timestep, 4);
        assert_eq!(traxel.feature(FEATURE_COUNT), Some(&[6.0][..]));
        assert_eq!(traxel.feature(FEATURE_COM), Some(&[1.0, 0.5][..]));
    }

    #[test]
    fn test_empty_slice_has_no_centroid() {
        let slice = Slice::new(SliceId::new(1), 0, Region::new());
        let traxel = Traxel::from_slice(&slice, 0);

        assert_eq!(traxel.feature(FEATURE_COUNT), Some(&[0.0][..]));
        assert_eq!(traxel.feature(FEATURE_COM), None);
    }
}
