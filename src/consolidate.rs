//! Fixed-point duplicate consolidation across hierarchy levels.
//!
//! Level 0 holds the coarsest candidates; each deeper level refines the one
//! above it. The same object is often extracted at several levels with nearly
//! the same shape. Consolidation keeps the shallowest observation as the
//! representative, removes the deeper duplicates, and shrinks the
//! representative to the pixels every observing level agrees on.
//!
//! ## Algorithm
//!
//! Each pass has two phases:
//!
//! 1. **Scan** (read-only). For each level `L` in order and each unclaimed
//!    slice `s` in `L`, every unclaimed slice `s′` at a deeper level with
//!    `normalized(s, s′) >= threshold` is claimed as a duplicate of `s`, in
//!    discovery order.
//! 2. **Apply**. Each representative is intersected with its duplicates
//!    (discovery order), then every claimed slice is removed from its level.
//!
//! Passes repeat while the total slice count decreases: a shrunken
//! representative can match slices it did not match before.
//!
//! Within a pass every comparison sees pass-start regions. A representative
//! is only compared against deeper levels, and it is refined only after its
//! own scan, so deferring all mutation to the apply phase gives the same
//! result as refining in place.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::{ConfigError, ConsolidationConfig};
use crate::overlap::Overlap;
use crate::types::{Region, SliceId, SliceSet};

/// Duplicates found for one representative during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Merge {
    level: usize,
    representative: SliceId,
    duplicates: Vec<(usize, SliceId)>,
}

/// Summary of a consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationStats {
    /// Slices across all levels before the first pass.
    pub initial_count: usize,
    /// Slices across all levels after the last pass.
    pub final_count: usize,
    /// Number of passes run, including the final pass that removed nothing.
    pub passes: usize,
}

impl ConsolidationStats {
    /// Number of slices removed as duplicates.
    pub fn removed(&self) -> usize {
        self.initial_count - self.final_count
    }
}

/// Result of consolidating one section's levels.
#[derive(Debug, Clone, Default)]
pub struct Consolidation {
    /// Surviving slices, per level, in original order.
    pub levels: Vec<SliceSet>,
    /// Surviving representative id -> every slice merged into it, in
    /// discovery order.
    ///
    /// When a representative is itself absorbed in a later pass, its ids move
    /// to the new representative right after it, so every key survives and
    /// the region of a key is its original region intersected with the
    /// original regions of all listed ids.
    pub absorbed: BTreeMap<SliceId, Vec<SliceId>>,
    /// Counts.
    pub stats: ConsolidationStats,
}

/// Total number of slices across levels.
pub fn count_slices(levels: &[SliceSet]) -> usize {
    levels.iter().map(SliceSet::len).sum()
}

/// Merges near-duplicate slices across hierarchy levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateConsolidator {
    config: ConsolidationConfig,
    overlap: Overlap,
}

impl DuplicateConsolidator {
    /// Create a consolidator from a validated configuration.
    pub fn new(config: ConsolidationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            overlap: Overlap::normalized(),
        })
    }

    /// Create a consolidator with the given threshold.
    pub fn with_threshold(similarity_threshold: f64) -> Result<Self, ConfigError> {
        Self::new(ConsolidationConfig::new(similarity_threshold)?)
    }

    /// The similarity threshold in use.
    pub fn similarity_threshold(&self) -> f64 {
        self.config.similarity_threshold
    }

    /// Run passes until the slice count stops decreasing.
    pub fn consolidate(&self, levels: Vec<SliceSet>) -> Consolidation {
        let mut levels = levels;
        let mut absorbed: BTreeMap<SliceId, Vec<SliceId>> = BTreeMap::new();

        let initial_count = count_slices(&levels);
        tracing::debug!(
            slices = initial_count,
            levels = levels.len(),
            threshold = self.config.similarity_threshold,
            "removing duplicates"
        );

        let mut passes = 0;
        let mut size = initial_count;
        loop {
            passes += 1;
            let merges = self.scan(&levels);
            apply(&mut levels, &merges);

            for merge in merges {
                let mut ids = Vec::with_capacity(merge.duplicates.len());
                for (_, id) in merge.duplicates {
                    ids.push(id);
                    // an absorbed representative hands over its own ledger
                    if let Some(inherited) = absorbed.remove(&id) {
                        ids.extend(inherited);
                    }
                }
                absorbed.entry(merge.representative).or_default().extend(ids);
            }

            let new_size = count_slices(&levels);
            tracing::debug!(pass = passes, before = size, after = new_size, "duplicate pass");

            if new_size >= size {
                break;
            }
            size = new_size;
        }

        let stats = ConsolidationStats {
            initial_count,
            final_count: size,
            passes,
        };
        tracing::debug!(removed = stats.removed(), passes, "duplicates removed");

        Consolidation {
            levels,
            absorbed,
            stats,
        }
    }

    /// Run a single pass in place, returning the number of slices removed.
    pub fn pass(&self, levels: &mut [SliceSet]) -> usize {
        let before = count_slices(levels);
        let merges = self.scan(levels);
        apply(levels, &merges);
        before - count_slices(levels)
    }

    fn scan(&self, levels: &[SliceSet]) -> Vec<Merge> {
        let threshold = self.config.similarity_threshold;
        let mut claimed: BTreeSet<SliceId> = BTreeSet::new();
        let mut merges = Vec::new();

        for (level, slices) in levels.iter().enumerate() {
            tracing::trace!(level, "processing level");

            for slice in slices {
                if claimed.contains(&slice.id()) {
                    continue;
                }

                let mut duplicates = Vec::new();
                for (sub_level, sub_slices) in levels.iter().enumerate().skip(level + 1) {
                    for sub_slice in sub_slices {
                        if claimed.contains(&sub_slice.id()) {
                            continue;
                        }
                        if self.overlap.measure(slice, sub_slice) >= threshold {
                            claimed.insert(sub_slice.id());
                            duplicates.push((sub_level, sub_slice.id()));
                        }
                    }
                }

                if !duplicates.is_empty() {
                    tracing::trace!(
                        level,
                        representative = %slice.id(),
                        duplicates = duplicates.len(),
                        "found duplicates"
                    );
                    merges.push(Merge {
                        level,
                        representative: slice.id(),
                        duplicates,
                    });
                }
            }
        }

        merges
    }
}

impl Default for DuplicateConsolidator {
    fn default() -> Self {
        Self {
            config: ConsolidationConfig::default(),
            overlap: Overlap::normalized(),
        }
    }
}

fn apply(levels: &mut [SliceSet], merges: &[Merge]) {
    if merges.is_empty() {
        return;
    }

    // Duplicate regions are read before anything is removed.
    let mut removals: Vec<BTreeSet<SliceId>> = vec![BTreeSet::new(); levels.len()];
    let mut refinements: Vec<(usize, SliceId, Vec<Arc<Region>>)> = Vec::with_capacity(merges.len());

    for merge in merges {
        let regions = merge
            .duplicates
            .iter()
            .filter_map(|&(sub_level, id)| {
                removals[sub_level].insert(id);
                levels[sub_level].get(id).map(|s| s.region_handle())
            })
            .collect();
        refinements.push((merge.level, merge.representative, regions));
    }

    for (level, representative, regions) in refinements {
        for region in regions {
            levels[level].intersect_slice(representative, &region);
        }
    }

    for (slices, ids) in levels.iter_mut().zip(&removals) {
        if !ids.is_empty() {
            slices.remove_ids(ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Pixel, Slice};

    fn slice(id: u32, region: Region) -> Slice {
        Slice::new(SliceId::new(id), 0, region)
    }

    fn level(slices: Vec<Slice>) -> SliceSet {
        SliceSet::from_slices(slices).unwrap()
    }

    #[test]
    fn test_exact_duplicate_removed() {
        let levels = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 10, 10))]),
            level(vec![slice(2, Region::rectangle(0, 0, 10, 10))]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);

        assert_eq!(result.levels[0].ids(), vec![SliceId::new(1)]);
        assert!(result.levels[1].is_empty());
        assert_eq!(result.absorbed[&SliceId::new(1)], vec![SliceId::new(2)]);
        assert_eq!(result.stats.removed(), 1);
    }

    #[test]
    fn test_representative_shrinks_to_intersection() {
        // 10x10 and 10x9 share 90 px: similarity 0.9
        let levels = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 10, 10))]),
            level(vec![slice(2, Region::rectangle(0, 1, 10, 9))]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);
        let representative = result.levels[0].get(SliceId::new(1)).unwrap();

        assert_eq!(representative.size(), 90);
        assert!(!representative.region().contains(Pixel::new(0, 0)));
    }

    #[test]
    fn test_dissimilar_slices_survive() {
        let levels = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 10, 10))]),
            level(vec![
                slice(2, Region::rectangle(0, 0, 5, 10)),
                slice(3, Region::rectangle(5, 0, 5, 10)),
            ]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);

        assert_eq!(result.stats.initial_count, 3);
        assert_eq!(result.stats.final_count, 3);
        assert_eq!(result.stats.passes, 1);
        assert!(result.absorbed.is_empty());
        assert_eq!(result.levels[0].get(SliceId::new(1)).unwrap().size(), 100);
    }

    #[test]
    fn test_duplicate_claimed_once_within_pass() {
        // Both level-0 slices match slice 3; only the first claims it
        let levels = vec![
            level(vec![
                slice(1, Region::rectangle(0, 0, 10, 10)),
                slice(2, Region::rectangle(0, 0, 10, 10)),
            ]),
            level(vec![slice(3, Region::rectangle(0, 0, 10, 10))]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);

        assert_eq!(result.absorbed.len(), 1);
        assert_eq!(result.absorbed[&SliceId::new(1)], vec![SliceId::new(3)]);
        assert_eq!(result.levels[0].len(), 2);
    }

    #[test]
    fn test_chain_across_three_levels() {
        // Level 1 duplicates level 0; level 2 duplicates both
        let levels = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 10, 10))]),
            level(vec![slice(2, Region::rectangle(0, 0, 10, 9))]),
            level(vec![slice(3, Region::rectangle(0, 0, 9, 9))]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);

        assert_eq!(count_slices(&result.levels), 1);
        assert_eq!(
            result.absorbed[&SliceId::new(1)],
            vec![SliceId::new(2), SliceId::new(3)]
        );
        assert_eq!(result.levels[0].get(SliceId::new(1)).unwrap().size(), 81);
    }

    #[test]
    fn test_shrinking_exposes_new_duplicate() {
        // A (100 px) vs B (70 px inside A): 0.70, below threshold.
        // A vs C (80 px inside A): 0.80, duplicate; A shrinks to C.
        // Second pass: A' (80 px) vs B (70 px inside C): 0.875, duplicate.
        let a = Region::rectangle(0, 0, 10, 10);
        let c = Region::rectangle(0, 0, 10, 8);
        let b = Region::rectangle(0, 0, 10, 7);

        let levels = vec![
            level(vec![slice(1, a)]),
            level(vec![slice(2, b)]),
            level(vec![slice(3, c)]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);

        assert_eq!(result.stats.passes, 3);
        assert_eq!(count_slices(&result.levels), 1);
        assert_eq!(
            result.absorbed[&SliceId::new(1)],
            vec![SliceId::new(3), SliceId::new(2)]
        );
        assert_eq!(result.levels[0].get(SliceId::new(1)).unwrap().size(), 70);
    }

    #[test]
    fn test_similarity_at_threshold_is_duplicate() {
        // 12 of 16 pixels shared: exactly 0.75
        let levels = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 4, 4))]),
            level(vec![slice(2, Region::rectangle(0, 0, 4, 3))]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);

        assert!(result.levels[1].is_empty());
        assert_eq!(result.absorbed[&SliceId::new(1)], vec![SliceId::new(2)]);
        assert_eq!(result.levels[0].get(SliceId::new(1)).unwrap().size(), 12);
    }

    #[test]
    fn test_unit_threshold_requires_identical_regions() {
        let consolidator = DuplicateConsolidator::with_threshold(1.0).unwrap();

        let identical = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 4, 4))]),
            level(vec![slice(2, Region::rectangle(0, 0, 4, 4))]),
        ];
        let result = consolidator.consolidate(identical);
        assert_eq!(count_slices(&result.levels), 1);
        assert_eq!(result.absorbed[&SliceId::new(1)], vec![SliceId::new(2)]);

        let nearly = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 4, 4))]),
            level(vec![slice(2, Region::rectangle(0, 0, 4, 3))]),
        ];
        let result = consolidator.consolidate(nearly);
        assert_eq!(count_slices(&result.levels), 2);
        assert!(result.absorbed.is_empty());
    }

    #[test]
    fn test_absorbed_representative_hands_over_ledger() {
        // Pass 1: A takes C (A becomes 10x8), B takes D (B becomes 10x6).
        // Pass 2: A' vs B' is 60 / 80 = 0.75, so A takes B and B's ledger.
        let levels = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 10, 10))]),
            level(vec![slice(2, Region::rectangle(0, 0, 10, 7))]),
            level(vec![slice(3, Region::rectangle(0, 0, 10, 8))]),
            level(vec![slice(4, Region::rectangle(0, 0, 10, 6))]),
        ];

        let result = DuplicateConsolidator::default().consolidate(levels);

        assert_eq!(result.stats.passes, 3);
        assert_eq!(count_slices(&result.levels), 1);
        assert_eq!(result.absorbed.len(), 1);
        assert_eq!(
            result.absorbed[&SliceId::new(1)],
            vec![SliceId::new(3), SliceId::new(2), SliceId::new(4)]
        );
        assert_eq!(result.levels[0].get(SliceId::new(1)).unwrap().size(), 60);
    }

    #[test]
    fn test_single_level_untouched() {
        let levels = vec![level(vec![
            slice(1, Region::rectangle(0, 0, 10, 10)),
            slice(2, Region::rectangle(0, 0, 10, 10)),
        ])];

        let result = DuplicateConsolidator::default().consolidate(levels);
        assert_eq!(result.levels[0].len(), 2);
    }

    #[test]
    fn test_pass_reports_removed() {
        let mut levels = vec![
            level(vec![slice(1, Region::rectangle(0, 0, 4, 4))]),
            level(vec![slice(2, Region::rectangle(0, 0, 4, 4))]),
        ];
        let consolidator = DuplicateConsolidator::default();

        assert_eq!(consolidator.pass(&mut levels), 1);
        assert_eq!(consolidator.pass(&mut levels), 0);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(DuplicateConsolidator::with_threshold(1.01).is_err());
        assert_eq!(
            DuplicateConsolidator::with_threshold(0.9).unwrap().similarity_threshold(),
            0.9
        );
    }

    #[test]
    fn test_empty_input() {
        let result = DuplicateConsolidator::default().consolidate(Vec::new());
        assert!(result.levels.is_empty());
        assert_eq!(result.stats.passes, 1);
    }
}
