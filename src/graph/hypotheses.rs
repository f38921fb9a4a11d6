//! Timestep-indexed tracking hypotheses.
//!
//! Nodes are object hypotheses at one timestep, arcs are candidate
//! transitions between them. The set of distinct node timesteps is cached
//! on insertion. Nodes are never removed (solution membership is the
//! `active` flag), so the cache only grows and earliest/latest queries do not
//! scan the nodes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::digraph::{ArcId, ListDigraph, NodeId};
use super::property::{
    ArcActive, ArcFromTimestep, ArcToTimestep, NodeActive, NodeTimestep, NodeTraxel, Property,
    PropertyMap, PropertyRegistry, WritableProperty,
};
use super::traxel::Traxel;
use super::GraphError;
use crate::canonical::canonical_hash_hex;

/// Directed graph of tracking hypotheses with typed properties.
#[derive(Debug)]
pub struct HypothesesGraph {
    graph: ListDigraph,
    properties: PropertyRegistry,
    timesteps: BTreeSet<i32>,
}

impl HypothesesGraph {
    /// Create an empty graph with the built-in node and arc properties.
    pub fn new() -> Self {
        let mut properties = PropertyRegistry::new();
        properties.register(PropertyMap::<NodeTimestep>::new());
        properties.register(PropertyMap::<NodeTraxel>::new());
        properties.register(PropertyMap::<NodeActive>::new());
        properties.register(PropertyMap::<ArcFromTimestep>::new());
        properties.register(PropertyMap::<ArcToTimestep>::new());
        properties.register(PropertyMap::<ArcActive>::new());

        Self {
            graph: ListDigraph::new(),
            properties,
            timesteps: BTreeSet::new(),
        }
    }

    /// Add a node at `timestep`.
    pub fn add_node(&mut self, timestep: i32) -> NodeId {
        let node = self.graph.add_node();
        self.map_mut::<NodeTimestep>().set(node, timestep);
        self.timesteps.insert(timestep);
        node
    }

    /// Add an arc `from → to`, stamping both endpoint timesteps.
    pub fn add_arc(&mut self, from: NodeId, to: NodeId) -> Result<ArcId, GraphError> {
        let from_timestep = self.node_timestep(from).ok_or(GraphError::UnknownNode(from))?;
        let to_timestep = self.node_timestep(to).ok_or(GraphError::UnknownNode(to))?;

        let arc = self
            .graph
            .add_arc(from, to)
            .ok_or(GraphError::InvalidState("node timestep without node"))?;
        self.map_mut::<ArcFromTimestep>().set(arc, from_timestep);
        self.map_mut::<ArcToTimestep>().set(arc, to_timestep);
        Ok(arc)
    }

    /// Distinct node timesteps, ascending.
    pub fn timesteps(&self) -> &BTreeSet<i32> {
        &self.timesteps
    }

    /// Smallest node timestep.
    pub fn earliest_timestep(&self) -> Result<i32, GraphError> {
        self.timesteps
            .first()
            .copied()
            .ok_or(GraphError::InvalidState("graph has no nodes"))
    }

    /// Largest node timestep.
    pub fn latest_timestep(&self) -> Result<i32, GraphError> {
        self.timesteps
            .last()
            .copied()
            .ok_or(GraphError::InvalidState("graph has no nodes"))
    }

    /// Timestep of `node`.
    pub fn node_timestep(&self, node: NodeId) -> Option<i32> {
        self.map::<NodeTimestep>().get(node).copied()
    }

    /// `(from, to)` timesteps of `arc`.
    pub fn arc_timesteps(&self, arc: ArcId) -> Option<(i32, i32)> {
        let from = self.map::<ArcFromTimestep>().get(arc)?;
        let to = self.map::<ArcToTimestep>().get(arc)?;
        Some((*from, *to))
    }

    /// Attach a feature record to `node`.
    pub fn set_traxel(&mut self, node: NodeId, traxel: Traxel) -> Result<(), GraphError> {
        self.check_node(node)?;
        self.map_mut::<NodeTraxel>().set(node, traxel);
        Ok(())
    }

    /// Feature record of `node`.
    pub fn traxel(&self, node: NodeId) -> Option<&Traxel> {
        self.map::<NodeTraxel>().get(node)
    }

    /// Mark `node` as in or out of the solution.
    pub fn set_node_active(&mut self, node: NodeId, active: bool) -> Result<(), GraphError> {
        self.check_node(node)?;
        self.map_mut::<NodeActive>().set(node, active);
        Ok(())
    }

    /// Whether `node` is in the solution (false until set).
    pub fn is_node_active(&self, node: NodeId) -> bool {
        self.map::<NodeActive>().get(node).copied().unwrap_or(false)
    }

    /// Mark `arc` as in or out of the solution.
    pub fn set_arc_active(&mut self, arc: ArcId, active: bool) -> Result<(), GraphError> {
        if !self.graph.contains_arc(arc) {
            return Err(GraphError::UnknownArc(arc));
        }
        self.map_mut::<ArcActive>().set(arc, active);
        Ok(())
    }

    /// Whether `arc` is in the solution (false until set).
    pub fn is_arc_active(&self, arc: ArcId) -> bool {
        self.map::<ArcActive>().get(arc).copied().unwrap_or(false)
    }

    /// Read access to a registered property.
    pub fn property<P: Property>(&self) -> Option<&PropertyMap<P>> {
        self.properties.get::<P>()
    }

    /// Write access to a registered writable property.
    ///
    /// Keys written through the map are not checked against the graph.
    pub fn property_mut<P: WritableProperty>(&mut self) -> Option<&mut PropertyMap<P>> {
        self.properties.get_mut::<P>()
    }

    /// Register an additional property. Returns false if `P` already exists.
    pub fn register_property<P: Property>(&mut self, map: PropertyMap<P>) -> bool {
        self.properties.register(map)
    }

    /// Names of all registered properties, sorted.
    pub fn property_names(&self) -> Vec<&'static str> {
        self.properties.names()
    }

    /// Nodes at `timestep`, ascending.
    pub fn nodes_at(&self, timestep: i32) -> Vec<NodeId> {
        if !self.timesteps.contains(&timestep) {
            return Vec::new();
        }
        self.map::<NodeTimestep>().keys_with(&timestep)
    }

    /// Active nodes, ascending.
    pub fn active_nodes(&self) -> Vec<NodeId> {
        self.map::<NodeActive>().keys_with(&true)
    }

    /// Active arcs, ascending.
    pub fn active_arcs(&self) -> Vec<ArcId> {
        self.map::<ArcActive>().keys_with(&true)
    }

    /// Outgoing arcs of `node`.
    pub fn out_arcs(&self, node: NodeId) -> &[ArcId] {
        self.graph.out_arcs(node)
    }

    /// Incoming arcs of `node`.
    pub fn in_arcs(&self, node: NodeId) -> &[ArcId] {
        self.graph.in_arcs(node)
    }

    /// Source node of `arc`.
    pub fn source(&self, arc: ArcId) -> Option<NodeId> {
        self.graph.source(arc)
    }

    /// Target node of `arc`.
    pub fn target(&self, arc: ArcId) -> Option<NodeId> {
        self.graph.target(arc)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        self.graph.nodes()
    }

    /// All arcs in insertion order.
    pub fn arcs(&self) -> impl Iterator<Item = ArcId> {
        self.graph.arcs()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of arcs.
    pub fn arc_count(&self) -> usize {
        self.graph.arc_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Serializable snapshot of nodes, arcs and built-in properties.
    pub fn export(&self) -> HypothesesExport {
        let nodes: Vec<NodeExport> = self
            .nodes()
            .filter_map(|id| {
                Some(NodeExport {
                    id,
                    timestep: self.node_timestep(id)?,
                    active: self.is_node_active(id),
                    traxel: self.traxel(id).cloned(),
                })
            })
            .collect();

        let arcs: Vec<ArcExport> = self
            .arcs()
            .filter_map(|id| {
                let (from_timestep, to_timestep) = self.arc_timesteps(id)?;
                Some(ArcExport {
                    id,
                    source: self.source(id)?,
                    target: self.target(id)?,
                    from_timestep,
                    to_timestep,
                    active: self.is_arc_active(id),
                })
            })
            .collect();

        HypothesesExport::new(nodes, arcs, self.timesteps.iter().copied().collect())
    }

    fn check_node(&self, node: NodeId) -> Result<(), GraphError> {
        if self.graph.contains_node(node) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(node))
        }
    }

    // Built-in properties are registered in `new` and can never be replaced.
    fn map<P: Property>(&self) -> &PropertyMap<P> {
        match self.properties.get::<P>() {
            Some(map) => map,
            None => unreachable!("built-in property {} not registered", P::NAME),
        }
    }

    fn map_mut<P: Property>(&mut self) -> &mut PropertyMap<P> {
        match self.properties.get_mut::<P>() {
            Some(map) => map,
            None => unreachable!("built-in property {} not registered", P::NAME),
        }
    }
}

impl Default for HypothesesGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Exported node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeExport {
    /// Node handle.
    pub id: NodeId,
    /// Node timestep.
    pub timestep: i32,
    /// Solution membership.
    pub active: bool,
    /// Feature record, if any.
    pub traxel: Option<Traxel>,
}

/// Exported arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcExport {
    /// Arc handle.
    pub id: ArcId,
    /// Source node.
    pub source: NodeId,
    /// Target node.
    pub target: NodeId,
    /// Source timestep.
    pub from_timestep: i32,
    /// Target timestep.
    pub to_timestep: i32,
    /// Solution membership.
    pub active: bool,
}

/// Canonically ordered graph snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesesExport {
    /// Nodes in handle order.
    pub nodes: Vec<NodeExport>,
    /// Arcs in handle order.
    pub arcs: Vec<ArcExport>,
    /// Distinct node timesteps, ascending.
    pub timesteps: Vec<i32>,
    /// Hash of nodes and arcs.
    pub export_hash: String,
}

impl HypothesesExport {
    fn new(nodes: Vec<NodeExport>, arcs: Vec<ArcExport>, timesteps: Vec<i32>) -> Self {
        let export_hash = canonical_hash_hex(&(&nodes, &arcs));
        Self {
            nodes,
            arcs,
            timesteps,
            export_hash,
        }
    }

    /// Recompute the hash and compare it with the stored one.
    pub fn verify_hash(&self) -> bool {
        canonical_hash_hex(&(&self.nodes, &self.arcs)) == self.export_hash
    }
}
