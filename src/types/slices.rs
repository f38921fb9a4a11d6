//! Ordered slice collections with a symmetric conflict registry.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::region::Region;
use super::slice::{Slice, SliceId};
use crate::canonical::canonical_hash_hex;

/// Error type for slice set mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SliceSetError {
    /// A slice with this id is already in the set.
    #[error("Duplicate slice id: {0}")]
    DuplicateId(SliceId),
}

/// Ordered collection of slices plus the conflicts known between them.
///
/// ## Invariants
///
/// - Slice ids are unique within the set.
/// - Insertion order is preserved and is the only meaningful order.
/// - The conflict registry is symmetric: `b ∈ conflicts(a) ⇔ a ∈ conflicts(b)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "SliceSetRepr")]
pub struct SliceSet {
    slices: Vec<Slice>,
    /// Id -> position in `slices`.
    #[serde(skip)]
    index: BTreeMap<SliceId, usize>,
    conflicts: BTreeMap<SliceId, BTreeSet<SliceId>>,
}

/// Serialized form; the id index is rebuilt on load.
#[derive(Deserialize)]
struct SliceSetRepr {
    slices: Vec<Slice>,
    #[serde(default)]
    conflicts: BTreeMap<SliceId, BTreeSet<SliceId>>,
}

impl TryFrom<SliceSetRepr> for SliceSet {
    type Error = SliceSetError;

    fn try_from(repr: SliceSetRepr) -> Result<Self, Self::Error> {
        let mut set = SliceSet::from_slices(repr.slices)?;
        // one-sided entries are mirrored
        for (a, others) in repr.conflicts {
            for b in others {
                set.add_conflicts(&[a, b]);
            }
        }
        Ok(set)
    }
}

impl SliceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from slices, rejecting duplicate ids.
    pub fn from_slices<I>(slices: I) -> Result<Self, SliceSetError>
    where
        I: IntoIterator<Item = Slice>,
    {
        let mut set = Self::new();
        set.add_all(slices)?;
        Ok(set)
    }

    /// Append a single slice.
    pub fn add(&mut self, slice: Slice) -> Result<(), SliceSetError> {
        if self.index.contains_key(&slice.id()) {
            return Err(SliceSetError::DuplicateId(slice.id()));
        }
        self.index.insert(slice.id(), self.slices.len());
        self.slices.push(slice);
        Ok(())
    }

    /// Append slices in iteration order.
    ///
    /// Stops at the first duplicate id; slices before it stay inserted.
    pub fn add_all<I>(&mut self, slices: I) -> Result<(), SliceSetError>
    where
        I: IntoIterator<Item = Slice>,
    {
        for slice in slices {
            self.add(slice)?;
        }
        Ok(())
    }

    /// Record that all slices in `group` are mutually exclusive.
    ///
    /// Every unordered pair of distinct ids in the group is added in both
    /// directions. Ids do not have to be members of this set.
    pub fn add_conflicts(&mut self, group: &[SliceId]) {
        for (i, &a) in group.iter().enumerate() {
            for &b in &group[i + 1..] {
                if a == b {
                    continue;
                }
                self.conflicts.entry(a).or_default().insert(b);
                self.conflicts.entry(b).or_default().insert(a);
            }
        }
    }

    /// Ids known to conflict with `id` (empty if none).
    pub fn conflicts_of(&self, id: SliceId) -> impl Iterator<Item = SliceId> + '_ {
        self.conflicts.get(&id).into_iter().flatten().copied()
    }

    /// Whether a conflict between `a` and `b` has been recorded.
    pub fn has_conflict(&self, a: SliceId, b: SliceId) -> bool {
        self.conflicts.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Number of recorded conflicts for `id`.
    pub fn conflict_count(&self, id: SliceId) -> usize {
        self.conflicts.get(&id).map_or(0, BTreeSet::len)
    }

    /// All recorded unordered conflict pairs as `(smaller, larger)`.
    pub fn conflict_pairs(&self) -> Vec<(SliceId, SliceId)> {
        self.conflicts
            .iter()
            .flat_map(|(&a, others)| others.iter().filter(move |&&b| a < b).map(move |&b| (a, b)))
            .collect()
    }

    /// Number of slices.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Whether the set has no slices.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Slices in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Slice> {
        self.slices.iter()
    }

    /// Slices as a slice.
    pub fn as_slice(&self) -> &[Slice] {
        &self.slices
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<SliceId> {
        self.slices.iter().map(Slice::id).collect()
    }

    /// Whether a slice with `id` is present.
    pub fn contains(&self, id: SliceId) -> bool {
        self.index.contains_key(&id)
    }

    /// Look up a slice by id.
    pub fn get(&self, id: SliceId) -> Option<&Slice> {
        self.index.get(&id).map(|&i| &self.slices[i])
    }

    /// Total pixel count over all slices.
    pub fn total_size(&self) -> usize {
        self.slices.iter().map(Slice::size).sum()
    }

    /// Canonical content hash over slices (in order) and conflicts.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&(&self.slices, &self.conflicts))
    }

    /// Intersect the region of slice `id` with `region`.
    pub(crate) fn intersect_slice(&mut self, id: SliceId, region: &Region) {
        if let Some(&i) = self.index.get(&id) {
            self.slices[i].intersect_region(region);
        }
    }

    /// Remove every slice whose id is in `ids`, keeping the order of the rest.
    ///
    /// Conflicts recorded for removed ids are left in place.
    pub(crate) fn remove_ids(&mut self, ids: &BTreeSet<SliceId>) -> usize {
        let before = self.slices.len();
        self.slices.retain(|s| !ids.contains(&s.id()));
        let removed = before - self.slices.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    fn reindex(&mut self) {
        self.index = self
            .slices
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id(), i))
            .collect();
    }
}

impl<'a> IntoIterator for &'a SliceSet {
    type Item = &'a Slice;
    type IntoIter = std::slice::Iter<'a, Slice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}
