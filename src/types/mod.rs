//! Core types for the slice kernel.

pub mod region;
pub mod slice;
pub mod slices;
pub mod constraint;

pub use region::{Pixel, BoundingBox, Region};
pub use slice::{Slice, SliceId};
pub use slices::{SliceSet, SliceSetError};
pub use constraint::{LinearConstraint, LinearConstraints, Relation};
