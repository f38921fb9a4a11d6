//! Per-section slice collection.
//!
//! Collapses the per-level candidates of one section into a single
//! [`SliceSet`] and the [`LinearConstraints`] a solver needs to select a
//! conflict-free subset of it.
//!
//! ```text
//! levels → DuplicateConsolidator → extract_slices → ConstraintSynthesizer
//!                                        ↓                   ↓
//!                                    SliceSet        LinearConstraints
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::{ConfigError, KernelConfig};
use crate::consolidate::{ConsolidationStats, DuplicateConsolidator};
use crate::constraints::ConstraintSynthesizer;
use crate::types::{LinearConstraints, SliceId, SliceSet, SliceSetError};

/// Error type for slice collection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollectError {
    /// The same slice id appears on two levels (or twice on one).
    #[error("Slice {0} appears more than once across levels")]
    DuplicateSliceId(SliceId),
    /// A slice carries a different section than the one being collected.
    #[error("Slice {id} belongs to section {found}, expected {expected}")]
    SectionMismatch {
        /// Offending slice.
        id: SliceId,
        /// Section being collected.
        expected: u32,
        /// Section carried by the slice.
        found: u32,
    },
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<SliceSetError> for CollectError {
    fn from(e: SliceSetError) -> Self {
        match e {
            SliceSetError::DuplicateId(id) => Self::DuplicateSliceId(id),
        }
    }
}

/// Output of collecting one section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedSlices {
    /// Section the slices belong to.
    pub section: u32,
    /// Surviving slices of all levels, level by level, with conflicts.
    pub slices: SliceSet,
    /// Consistency constraints over `slices` ids.
    pub constraints: LinearConstraints,
    /// Consolidation counts.
    pub stats: ConsolidationStats,
    /// Hash of the kernel parameters that produced this output.
    pub params_hash: String,
}

impl CollectedSlices {
    /// Canonical fingerprint of the consolidated slice set.
    pub fn fingerprint(&self) -> String {
        self.slices.fingerprint()
    }
}

/// Runs consolidation and constraint synthesis for one section.
#[derive(Debug, Clone, Copy)]
pub struct SliceCollector {
    consolidator: DuplicateConsolidator,
    synthesizer: ConstraintSynthesizer,
    config: KernelConfig,
}

impl SliceCollector {
    /// Create a collector from a validated configuration.
    pub fn new(config: KernelConfig) -> Result<Self, CollectError> {
        config.validate()?;
        Ok(Self {
            consolidator: DuplicateConsolidator::new(config.consolidation)?,
            synthesizer: ConstraintSynthesizer::new(config.synthesis),
            config,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Collect the levels of `section`.
    ///
    /// Fails before any work is done if slice ids repeat across levels or a
    /// slice belongs to another section.
    pub fn collect(
        &self,
        section: u32,
        levels: Vec<SliceSet>,
    ) -> Result<CollectedSlices, CollectError> {
        validate_levels(section, &levels)?;

        let consolidation = self.consolidator.consolidate(levels);
        let levels = consolidation.levels;

        let mut slices = extract_slices(&levels)?;
        let constraints = self.synthesizer.synthesize(&levels, &mut slices);

        debug_assert!(
            constraints.references_only(&slices),
            "constraint references a slice outside the collected set"
        );

        tracing::debug!(section, slices = slices.len(), "slices found");
        tracing::debug!(
            section,
            constraints = constraints.len(),
            "consistency constraints found"
        );

        Ok(CollectedSlices {
            section,
            slices,
            constraints,
            stats: consolidation.stats,
            params_hash: self.config.params_hash(),
        })
    }
}

impl Default for SliceCollector {
    fn default() -> Self {
        Self {
            consolidator: DuplicateConsolidator::default(),
            synthesizer: ConstraintSynthesizer::default(),
            config: KernelConfig::default(),
        }
    }
}

/// Merge levels into one set, level by level in insertion order.
pub fn extract_slices(levels: &[SliceSet]) -> Result<SliceSet, SliceSetError> {
    let mut all = SliceSet::new();
    for level in levels {
        all.add_all(level.iter().cloned())?;
    }
    Ok(all)
}

fn validate_levels(section: u32, levels: &[SliceSet]) -> Result<(), CollectError> {
    let mut seen = BTreeSet::new();
    for slice in levels.iter().flatten() {
        if !seen.insert(slice.id()) {
            return Err(CollectError::DuplicateSliceId(slice.id()));
        }
        if slice.section() != section {
            return Err(CollectError::SectionMismatch {
                id: slice.id(),
                expected: section,
                found: slice.section(),
            });
        }
    }
    Ok(())
}
