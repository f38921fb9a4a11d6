//! Adjacency-list directed graph with dense handles.
//!
//! Nodes and arcs are never removed, so handles stay valid for the lifetime
//! of the graph and double as indices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Get the raw index.
    pub fn get(&self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Handle of a graph arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArcId(u32);

impl ArcId {
    /// Get the raw index.
    pub fn get(&self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
struct NodeEntry {
    out_arcs: Vec<ArcId>,
    in_arcs: Vec<ArcId>,
}

#[derive(Debug, Clone, Copy)]
struct ArcEntry {
    source: NodeId,
    target: NodeId,
}

/// Directed multigraph storing incidence lists per node.
#[derive(Debug, Clone, Default)]
pub struct ListDigraph {
    nodes: Vec<NodeEntry>,
    arcs: Vec<ArcEntry>,
}

/// Handle for the next entry of a list holding `len` entries. `u32::MAX`
/// is never handed out so that every count still fits a `u32`.
fn next_index(len: usize) -> Option<u32> {
    u32::try_from(len).ok().filter(|&index| index < u32::MAX)
}

impl ListDigraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    ///
    /// # Panics
    ///
    /// Panics if the graph already holds `u32::MAX` nodes.
    pub fn add_node(&mut self) -> NodeId {
        let Some(index) = next_index(self.nodes.len()) else {
            panic!("node handle space exhausted");
        };
        let id = NodeId(index);
        self.nodes.push(NodeEntry::default());
        id
    }

    /// Add an arc `source → target`, or `None` if either endpoint is unknown.
    ///
    /// # Panics
    ///
    /// Panics if the graph already holds `u32::MAX` arcs.
    pub fn add_arc(&mut self, source: NodeId, target: NodeId) -> Option<ArcId> {
        if !self.contains_node(source) || !self.contains_node(target) {
            return None;
        }
        let Some(index) = next_index(self.arcs.len()) else {
            panic!("arc handle space exhausted");
        };
        let id = ArcId(index);
        self.arcs.push(ArcEntry { source, target });
        self.nodes[source.index()].out_arcs.push(id);
        self.nodes[target.index()].in_arcs.push(id);
        Some(id)
    }

    /// Whether `node` belongs to this graph.
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    /// Whether `arc` belongs to this graph.
    pub fn contains_arc(&self, arc: ArcId) -> bool {
        arc.index() < self.arcs.len()
    }

    /// Source node of `arc`.
    pub fn source(&self, arc: ArcId) -> Option<NodeId> {
        self.arcs.get(arc.index()).map(|a| a.source)
    }

    /// Target node of `arc`.
    pub fn target(&self, arc: ArcId) -> Option<NodeId> {
        self.arcs.get(arc.index()).map(|a| a.target)
    }

    /// Outgoing arcs of `node` in insertion order.
    pub fn out_arcs(&self, node: NodeId) -> &[ArcId] {
        self.nodes
            .get(node.index())
            .map(|n| n.out_arcs.as_slice())
            .unwrap_or(&[])
    }

    /// Incoming arcs of `node` in insertion order.
    pub fn in_arcs(&self, node: NodeId) -> &[ArcId] {
        self.nodes
            .get(node.index())
            .map(|n| n.in_arcs.as_slice())
            .unwrap_or(&[])
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of arcs.
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// All arcs in insertion order.
    pub fn arcs(&self) -> impl Iterator<Item = ArcId> {
        (0..self.arcs.len() as u32).map(ArcId)
    }
}
