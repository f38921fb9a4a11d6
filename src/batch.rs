//! Batch collection across sections.
//!
//! Sections share no mutable state, so they are collected on scoped worker
//! threads. Only the read-only collector configuration is shared; results are
//! gathered behind a mutex and reported in ascending section order.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::canonical::canonical_hash_hex;
use crate::collector::{CollectError, CollectedSlices, SliceCollector};
use crate::source::SliceSource;

/// Error type for batch collection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    /// The source failed to list sections.
    #[error("Source error: {0}")]
    Source(String),
    /// The source failed to extract one section.
    #[error("Extraction failed for section {section}: {message}")]
    Extraction {
        /// Failing section.
        section: u32,
        /// Source error message.
        message: String,
    },
    /// Collection of one section failed.
    #[error("Collection failed for section {section}: {source}")]
    Collect {
        /// Failing section.
        section: u32,
        /// Underlying error.
        source: CollectError,
    },
}

impl BatchError {
    /// Create a source error from any error type.
    pub fn from_source<E: std::error::Error>(e: E) -> Self {
        Self::Source(e.to_string())
    }

    /// Section the error refers to, if any.
    pub fn section(&self) -> Option<u32> {
        match self {
            Self::Source(_) => None,
            Self::Extraction { section, .. } | Self::Collect { section, .. } => Some(*section),
        }
    }
}

/// Metadata for one collected section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRegistryEntry {
    /// Section index.
    pub section: u32,
    /// Slices after consolidation.
    pub slice_count: usize,
    /// Constraint rows.
    pub constraint_count: usize,
    /// Slices removed as duplicates.
    pub removed_count: usize,
    /// Fingerprint of the consolidated slice set.
    pub fingerprint: String,
}

/// Registry of all sections in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRegistry {
    /// Entries in ascending section order.
    pub entries: Vec<SectionRegistryEntry>,
    /// Hash of the entries for integrity verification.
    pub registry_hash: String,
}

impl SectionRegistry {
    /// Create a registry from entries.
    pub fn new(mut entries: Vec<SectionRegistryEntry>) -> Self {
        entries.sort_by_key(|e| e.section);
        let registry_hash = canonical_hash_hex(&entries);
        Self {
            entries,
            registry_hash,
        }
    }

    /// Entry for `section`.
    pub fn get(&self, section: u32) -> Option<&SectionRegistryEntry> {
        self.entries.iter().find(|e| e.section == section)
    }
}

/// Result of a batch collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Per-section output.
    pub sections: BTreeMap<u32, CollectedSlices>,
    /// Per-section metadata.
    pub registry: SectionRegistry,
    /// Kernel parameters hash shared by every section.
    pub params_hash: String,
}

/// Collects many sections from one source in parallel.
pub struct BatchCollector<S: SliceSource> {
    source: Arc<S>,
    collector: SliceCollector,
    workers: usize,
}

impl<S: SliceSource> BatchCollector<S> {
    /// Create a batch collector using all available cores.
    pub fn new(source: Arc<S>, collector: SliceCollector) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            source,
            collector,
            workers,
        }
    }

    /// Limit the number of worker threads (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// The collector applied to every section.
    pub fn collector(&self) -> &SliceCollector {
        &self.collector
    }

    /// Collect every section the source lists.
    pub fn collect_all(&self) -> Result<BatchResult, BatchError> {
        let sections = self.source.sections().map_err(BatchError::from_source)?;
        self.collect_sections(&sections)
    }

    /// Collect the given sections (duplicates ignored).
    ///
    /// On failure, the error of the smallest failing section is returned.
    pub fn collect_sections(&self, sections: &[u32]) -> Result<BatchResult, BatchError> {
        let sections: Vec<u32> = sections.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let results: Mutex<BTreeMap<u32, Result<CollectedSlices, BatchError>>> =
            Mutex::new(BTreeMap::new());

        if !sections.is_empty() {
            let workers = self.workers.min(sections.len());
            let chunk_size = sections.len().div_ceil(workers);

            std::thread::scope(|scope| {
                for chunk in sections.chunks(chunk_size) {
                    let results = &results;
                    scope.spawn(move || {
                        for &section in chunk {
                            let outcome = self.collect_one(section);
                            results.lock().insert(section, outcome);
                        }
                    });
                }
            });
        }

        let mut collected = BTreeMap::new();
        for (section, outcome) in results.into_inner() {
            collected.insert(section, outcome?);
        }

        let entries = collected
            .values()
            .map(|c| SectionRegistryEntry {
                section: c.section,
                slice_count: c.slices.len(),
                constraint_count: c.constraints.len(),
                removed_count: c.stats.removed(),
                fingerprint: c.fingerprint(),
            })
            .collect();

        tracing::debug!(sections = collected.len(), "batch collected");

        Ok(BatchResult {
            sections: collected,
            registry: SectionRegistry::new(entries),
            params_hash: self.collector.config().params_hash(),
        })
    }

    fn collect_one(&self, section: u32) -> Result<CollectedSlices, BatchError> {
        let levels = self
            .source
            .extract_levels(section)
            .map_err(|e| BatchError::Extraction {
                section,
                message: e.to_string(),
            })?;

        match self.collector.collect(section, levels) {
            Ok(collected) => {
                tracing::debug!(
                    section,
                    slices = collected.slices.len(),
                    removed = collected.stats.removed(),
                    "section collected"
                );
                Ok(collected)
            }
            Err(source) => {
                tracing::warn!(section, error = %source, "section collection failed");
                Err(BatchError::Collect { section, source })
            }
        }
    }
}
