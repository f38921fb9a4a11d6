//! Hypotheses graph for cross-section tracking.
//!
//! Active slices chosen by the solver become nodes at their timestep; arcs
//! connect candidate transitions. Properties are stored in typed sparse maps
//! rather than on the node structs, so new properties can be attached without
//! touching the graph.

pub mod digraph;
pub mod hypotheses;
pub mod property;
pub mod traxel;

pub use digraph::{ArcId, ListDigraph, NodeId};
pub use hypotheses::{ArcExport, HypothesesExport, HypothesesGraph, NodeExport};
pub use property::{
    ArcActive, ArcFromTimestep, ArcToTimestep, NodeActive, NodeTimestep, NodeTraxel, Property,
    PropertyMap, PropertyRegistry, WritableProperty,
};
pub use traxel::Traxel;

/// Error type for graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The operation needs state the graph does not have.
    #[error("Invalid graph state: {0}")]
    InvalidState(&'static str),
    /// Node handle does not belong to this graph.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    /// Arc handle does not belong to this graph.
    #[error("Unknown arc: {0}")]
    UnknownArc(ArcId),
}
