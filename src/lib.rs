//! # slice-kernel
//!
//! Deterministic consolidation of hierarchical segmentation candidates.
//!
//! Per-level candidate regions ("slices") of one image section recur across
//! hierarchy levels with nearly the same shape. The kernel answers two
//! questions:
//!
//! > Which candidates are the same object? Which may never be selected together?
//!
//! ## Core Contract
//!
//! 1. Collapse near-duplicate slices across levels to a fixed point, shrinking
//!    each survivor to the intersection with everything it absorbed
//! 2. Emit one `x_s + x_s′ <= 1` row per overlapping surviving cross-level pair
//! 3. Hand the consolidated set, its conflicts and a fingerprint downstream
//!
//! ## Architecture
//!
//! ```text
//! SliceSource → levels → DuplicateConsolidator → SliceSet ─┐
//!                                                          ├→ CollectedSlices
//!                             ConstraintSynthesizer → LinearConstraints ─┘
//!
//! solver output → HypothesesGraph (timestep-indexed nodes and arcs)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same levels + same configuration → identical slice set fingerprint
//! - Constraint rows follow level order then slice insertion order
//! - Batch results are ordered by section regardless of worker count

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod config;
pub mod overlap;
pub mod consolidate;
pub mod constraints;
pub mod collector;
pub mod source;
pub mod batch;
pub mod graph;

// Re-exports
pub use types::{
    BoundingBox, LinearConstraint, LinearConstraints, Pixel, Region, Relation, Slice, SliceId,
    SliceSet, SliceSetError,
};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use config::{
    ConfigError, ConsolidationConfig, KernelConfig, SingletonPolicy, SynthesisConfig,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use overlap::{Overlap, OverlapMode};
pub use consolidate::{Consolidation, ConsolidationStats, DuplicateConsolidator};
pub use constraints::ConstraintSynthesizer;
pub use collector::{extract_slices, CollectError, CollectedSlices, SliceCollector};
pub use source::{InMemorySliceSource, InMemorySourceError, SliceSource};
pub use batch::{BatchCollector, BatchError, BatchResult, SectionRegistry, SectionRegistryEntry};
pub use graph::{
    ArcId, GraphError, HypothesesExport, HypothesesGraph, NodeId, Property, PropertyMap,
    Traxel, WritableProperty,
};

/// Schema version for all serialized kernel types.
/// Increment on breaking changes to any schema type.
pub const SLICE_KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Version tag mixed into every parameters hash.
pub const KERNEL_PARAMS_VERSION: &str = "slice_kernel_params_v1";
