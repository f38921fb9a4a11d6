//! In-memory slice source for precomputed levels and tests.

use std::collections::BTreeMap;

use super::SliceSource;
use crate::types::{Slice, SliceSet, SliceSetError};

/// Error type for the in-memory source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InMemorySourceError {
    /// No levels were registered for the section.
    #[error("Section not found: {0}")]
    SectionNotFound(u32),
}

/// In-memory slice source.
///
/// Uses a BTreeMap so sections iterate in ascending order.
#[derive(Debug, Clone, Default)]
pub struct InMemorySliceSource {
    sections: BTreeMap<u32, Vec<SliceSet>>,
}

impl InMemorySliceSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the levels of a section.
    pub fn insert_section(&mut self, section: u32, levels: Vec<SliceSet>) {
        self.sections.insert(section, levels);
    }

    /// Append a level built from `slices` to `section`.
    pub fn push_level<I>(&mut self, section: u32, slices: I) -> Result<(), SliceSetError>
    where
        I: IntoIterator<Item = Slice>,
    {
        let level = SliceSet::from_slices(slices)?;
        self.sections.entry(section).or_default().push(level);
        Ok(())
    }

    /// Number of registered sections.
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }
}

impl SliceSource for InMemorySliceSource {
    type Error = InMemorySourceError;

    fn sections(&self) -> Result<Vec<u32>, Self::Error> {
        Ok(self.sections.keys().copied().collect())
    }

    fn extract_levels(&self, section: u32) -> Result<Vec<SliceSet>, Self::Error> {
        self.sections
            .get(&section)
            .cloned()
            .ok_or(InMemorySourceError::SectionNotFound(section))
    }
}
