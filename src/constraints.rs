//! Exclusion constraint synthesis over consolidated slices.
//!
//! Two surviving slices on different levels that share a pixel cannot both
//! be selected. For every such pair (shallower level first) the pair is
//! recorded in the merged set's conflict registry and `x_s + x_s′ <= 1` is
//! emitted. Slices on the same level come from one threshold of the
//! component tree and are disjoint, so only strictly deeper levels are
//! scanned, which also yields exactly one row per unordered pair.
//!
//! Singleton rows `x_s <= 1` follow [`SingletonPolicy`].

use crate::config::{SingletonPolicy, SynthesisConfig};
use crate::overlap::Overlap;
use crate::types::{LinearConstraint, LinearConstraints, SliceId, SliceSet};

/// Derives pairwise and singleton rows from consolidated levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintSynthesizer {
    config: SynthesisConfig,
}

impl ConstraintSynthesizer {
    /// Create a synthesizer.
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Create a synthesizer with the given singleton policy.
    pub fn with_policy(singleton_policy: SingletonPolicy) -> Self {
        Self::new(SynthesisConfig { singleton_policy })
    }

    /// The singleton policy in use.
    pub fn singleton_policy(&self) -> SingletonPolicy {
        self.config.singleton_policy
    }

    /// Every overlapping cross-level pair `(shallower, deeper)` in scan order.
    pub fn conflicting_pairs(&self, levels: &[SliceSet]) -> Vec<(SliceId, SliceId)> {
        let raw = Overlap::raw();
        let mut pairs = Vec::new();

        for (level, slices) in levels.iter().enumerate() {
            for slice in slices {
                for sub_slices in &levels[level + 1..] {
                    for sub_slice in sub_slices {
                        if raw.measure(slice, sub_slice) > 0.0 {
                            pairs.push((slice.id(), sub_slice.id()));
                        }
                    }
                }
            }
        }

        pairs
    }

    /// Record conflicts into `registry` and return the constraint rows.
    ///
    /// Rows are ordered by level, then slice insertion order: each slice's
    /// pairwise rows (as the shallower member) followed by its singleton row,
    /// if the policy emits one.
    pub fn synthesize(&self, levels: &[SliceSet], registry: &mut SliceSet) -> LinearConstraints {
        let pairs = self.conflicting_pairs(levels);
        for &(a, b) in &pairs {
            registry.add_conflicts(&[a, b]);
        }

        let mut constraints = LinearConstraints::new();
        let mut pending = pairs.iter().peekable();

        for slice in levels.iter().flatten() {
            while let Some(&&(a, b)) = pending.peek() {
                if a != slice.id() {
                    break;
                }
                constraints.add(LinearConstraint::exclusive_pair(a, b));
                pending.next();
            }

            let singleton = match self.config.singleton_policy {
                SingletonPolicy::Always => true,
                SingletonPolicy::Unconflicted => registry.conflict_count(slice.id()) == 0,
            };
            if singleton {
                constraints.add(LinearConstraint::at_most_once(slice.id()));
            }
        }

        tracing::debug!(
            pairs = pairs.len(),
            rows = constraints.len(),
            policy = %self.config.singleton_policy,
            "consistency constraints synthesized"
        );

        constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Region, Slice};

    fn level(slices: &[(u32, Region)]) -> SliceSet {
        SliceSet::from_slices(
            slices
                .iter()
                .map(|(id, r)| Slice::new(SliceId::new(*id), 0, r.clone())),
        )
        .unwrap()
    }

    fn merged(levels: &[SliceSet]) -> SliceSet {
        let mut all = SliceSet::new();
        for l in levels {
            all.add_all(l.iter().cloned()).unwrap();
        }
        all
    }

    fn id(raw: u32) -> SliceId {
        SliceId::new(raw)
    }

    fn sample_levels() -> Vec<SliceSet> {
        // 1 overlaps 2 and 3; 4 is isolated at level 1
        vec![
            level(&[(1, Region::rectangle(0, 0, 10, 10))]),
            level(&[
                (2, Region::rectangle(0, 0, 5, 10)),
                (3, Region::rectangle(5, 0, 5, 10)),
                (4, Region::rectangle(40, 40, 3, 3)),
            ]),
        ]
    }

    #[test]
    fn test_pairs_and_registry() {
        let levels = sample_levels();
        let mut registry = merged(&levels);

        let rows = ConstraintSynthesizer::default().synthesize(&levels, &mut registry);

        assert!(registry.has_conflict(id(1), id(2)));
        assert!(registry.has_conflict(id(3), id(1)));
        assert!(!registry.has_conflict(id(2), id(3)));
        assert_eq!(registry.conflict_count(id(4)), 0);

        let rendered: Vec<String> = rows.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["1*x_1 + 1*x_2 <= 1", "1*x_1 + 1*x_3 <= 1", "1*x_4 <= 1"]
        );
    }

    #[test]
    fn test_always_policy_emits_every_singleton() {
        let levels = sample_levels();
        let mut registry = merged(&levels);

        let rows = ConstraintSynthesizer::with_policy(SingletonPolicy::Always)
            .synthesize(&levels, &mut registry);

        let rendered: Vec<String> = rows.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "1*x_1 + 1*x_2 <= 1",
                "1*x_1 + 1*x_3 <= 1",
                "1*x_1 <= 1",
                "1*x_2 <= 1",
                "1*x_3 <= 1",
                "1*x_4 <= 1",
            ]
        );
    }

    #[test]
    fn test_deeper_member_counts_as_conflicted() {
        // 2 only overlaps its parent 1; with the default policy neither gets
        // a singleton row
        let levels = vec![
            level(&[(1, Region::rectangle(0, 0, 4, 4))]),
            level(&[(2, Region::rectangle(0, 0, 2, 2))]),
        ];
        let mut registry = merged(&levels);

        let rows = ConstraintSynthesizer::default().synthesize(&levels, &mut registry);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows.iter().next().unwrap().coefficient(id(2)), 1.0);
    }

    #[test]
    fn test_same_level_overlap_ignored() {
        let levels = vec![level(&[
            (1, Region::rectangle(0, 0, 4, 4)),
            (2, Region::rectangle(0, 0, 4, 4)),
        ])];
        let mut registry = merged(&levels);

        let rows = ConstraintSynthesizer::default().synthesize(&levels, &mut registry);

        assert!(!registry.has_conflict(id(1), id(2)));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_pairs_span_non_adjacent_levels() {
        let levels = vec![
            level(&[(1, Region::rectangle(0, 0, 4, 4))]),
            level(&[(2, Region::rectangle(20, 0, 4, 4))]),
            level(&[(3, Region::rectangle(1, 1, 1, 1))]),
        ];

        let pairs = ConstraintSynthesizer::default().conflicting_pairs(&levels);
        assert_eq!(pairs, vec![(id(1), id(3))]);
    }

    #[test]
    fn test_rows_satisfiable_by_non_overlapping_selection() {
        let levels = sample_levels();
        let mut registry = merged(&levels);
        let rows = ConstraintSynthesizer::default().synthesize(&levels, &mut registry);

        let valid = [id(2), id(3), id(4)].into_iter().collect();
        let invalid = [id(1), id(2)].into_iter().collect();
        assert!(rows.are_satisfied_by(&valid));
        assert!(!rows.are_satisfied_by(&invalid));
    }
}
