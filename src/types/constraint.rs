//! Linear constraint rows over slice selection variables.
//!
//! Variable indices are slice ids directly: the coefficient for `SliceId(7)`
//! is the coefficient of `x_7` in the downstream program.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::slice::SliceId;
use super::slices::SliceSet;

/// Relation between the left-hand side and the bound of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// `lhs <= value`.
    LessEqual,
    /// `lhs == value`.
    Equal,
    /// `lhs >= value`.
    GreaterEqual,
}

impl Default for Relation {
    fn default() -> Self {
        Self::LessEqual
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LessEqual => write!(f, "<="),
            Self::Equal => write!(f, "=="),
            Self::GreaterEqual => write!(f, ">="),
        }
    }
}

/// One row `Σ cᵢ·xᵢ (relation) value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    coefficients: BTreeMap<SliceId, f64>,
    relation: Relation,
    value: f64,
}

impl LinearConstraint {
    /// Create an empty `0 <= 0` row.
    pub fn new() -> Self {
        Self::default()
    }

    /// `x_a + x_b <= 1`: at most one of two slices may be selected.
    pub fn exclusive_pair(a: SliceId, b: SliceId) -> Self {
        let mut row = Self::new();
        row.set_coefficient(a, 1.0);
        row.set_coefficient(b, 1.0);
        row.set_relation(Relation::LessEqual);
        row.set_value(1.0);
        row
    }

    /// `x_id <= 1`: the slice may be selected at most once.
    pub fn at_most_once(id: SliceId) -> Self {
        let mut row = Self::new();
        row.set_coefficient(id, 1.0);
        row.set_relation(Relation::LessEqual);
        row.set_value(1.0);
        row
    }

    /// Set (overwrite) the coefficient of `id`.
    pub fn set_coefficient(&mut self, id: SliceId, coefficient: f64) {
        self.coefficients.insert(id, coefficient);
    }

    /// Set the relation.
    pub fn set_relation(&mut self, relation: Relation) {
        self.relation = relation;
    }

    /// Set the right-hand side.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Coefficients keyed by slice id, ascending.
    pub fn coefficients(&self) -> &BTreeMap<SliceId, f64> {
        &self.coefficients
    }

    /// Coefficient of `id`, zero if absent.
    pub fn coefficient(&self, id: SliceId) -> f64 {
        self.coefficients.get(&id).copied().unwrap_or(0.0)
    }

    /// The relation.
    pub fn relation(&self) -> Relation {
        self.relation
    }

    /// The right-hand side.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether this row is satisfied when exactly the ids in `selected` are 1.
    pub fn is_satisfied_by(&self, selected: &BTreeSet<SliceId>) -> bool {
        let lhs: f64 = self
            .coefficients
            .iter()
            .filter(|(id, _)| selected.contains(*id))
            .map(|(_, c)| c)
            .sum();

        match self.relation {
            Relation::LessEqual => lhs <= self.value,
            Relation::Equal => (lhs - self.value).abs() < f64::EPSILON,
            Relation::GreaterEqual => lhs >= self.value,
        }
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficients.is_empty() {
            write!(f, "0")?;
        }
        for (i, (id, c)) in self.coefficients.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}*x_{}", c, id)?;
        }
        write!(f, " {} {}", self.relation, self.value)
    }
}

/// An ordered collection of constraint rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinearConstraints {
    rows: Vec<LinearConstraint>,
}

impl LinearConstraints {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row.
    pub fn add(&mut self, constraint: LinearConstraint) {
        self.rows.push(constraint);
    }

    /// Append all rows of another collection.
    pub fn add_all(&mut self, other: LinearConstraints) {
        self.rows.extend(other.rows);
    }

    /// Remove all rows.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, LinearConstraint> {
        self.rows.iter()
    }

    /// Every slice id with a coefficient in some row.
    pub fn referenced_ids(&self) -> BTreeSet<SliceId> {
        self.rows
            .iter()
            .flat_map(|row| row.coefficients.keys().copied())
            .collect()
    }

    /// Whether every referenced id is a member of `slices`.
    pub fn references_only(&self, slices: &SliceSet) -> bool {
        self.referenced_ids().into_iter().all(|id| slices.contains(id))
    }

    /// Whether the 0/1 assignment `selected` satisfies every row.
    pub fn are_satisfied_by(&self, selected: &BTreeSet<SliceId>) -> bool {
        self.rows.iter().all(|row| row.is_satisfied_by(selected))
    }
}

impl<'a> IntoIterator for &'a LinearConstraints {
    type Item = &'a LinearConstraint;
    type IntoIter = std::slice::Iter<'a, LinearConstraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
