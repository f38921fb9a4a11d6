//! Upstream slice sources.
//!
//! Per-level candidate extraction (component trees, MSER, threshold
//! hierarchies) happens outside this crate. A `SliceSource` hands the kernel
//! the levels of one section, coarsest first.

pub mod memory;

use crate::types::SliceSet;

/// Trait for per-level slice providers.
///
/// Implementations must return levels in hierarchy order (level 0 coarsest)
/// and slices within a level in a stable order, so that repeated collection
/// of the same section is deterministic.
pub trait SliceSource: Send + Sync {
    /// Error type for extraction failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sections this source can provide, ascending.
    fn sections(&self) -> Result<Vec<u32>, Self::Error>;

    /// Extract the levels of `section`.
    fn extract_levels(&self, section: u32) -> Result<Vec<SliceSet>, Self::Error>;
}

pub use memory::{InMemorySliceSource, InMemorySourceError};
