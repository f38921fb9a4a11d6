//! Typed property maps attached to graph nodes and arcs.
//!
//! Each property is a zero-sized marker implementing [`Property`]; its key
//! and value types are fixed at compile time. A [`PropertyRegistry`] holds
//! one sparse [`PropertyMap`] per marker type.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use super::digraph::{ArcId, NodeId};
use super::traxel::Traxel;

/// A named property over graph handles.
pub trait Property: 'static {
    /// Entity the property is attached to.
    type Key: Copy + Ord + fmt::Debug + Send + Sync + 'static;
    /// Stored value.
    type Value: Clone + fmt::Debug + Send + Sync + 'static;
    /// Stable property name.
    const NAME: &'static str;
}

/// Marker for properties callers may overwrite after insertion.
///
/// Timestep properties are stamped by the graph and deliberately lack it.
pub trait WritableProperty: Property {}

/// Timestep of a node.
#[derive(Debug)]
pub enum NodeTimestep {}

impl Property for NodeTimestep {
    type Key = NodeId;
    type Value = i32;
    const NAME: &'static str = "node_timestep";
}

/// Feature record of a node.
#[derive(Debug)]
pub enum NodeTraxel {}

impl Property for NodeTraxel {
    type Key = NodeId;
    type Value = Traxel;
    const NAME: &'static str = "node_traxel";
}

impl WritableProperty for NodeTraxel {}

/// Whether a node is part of the tracking solution.
#[derive(Debug)]
pub enum NodeActive {}

impl Property for NodeActive {
    type Key = NodeId;
    type Value = bool;
    const NAME: &'static str = "node_active";
}

impl WritableProperty for NodeActive {}

/// Timestep of an arc's source node.
#[derive(Debug)]
pub enum ArcFromTimestep {}

impl Property for ArcFromTimestep {
    type Key = ArcId;
    type Value = i32;
    const NAME: &'static str = "arc_from_timestep";
}

/// Timestep of an arc's target node.
#[derive(Debug)]
pub enum ArcToTimestep {}

impl Property for ArcToTimestep {
    type Key = ArcId;
    type Value = i32;
    const NAME: &'static str = "arc_to_timestep";
}

/// Whether an arc is part of the tracking solution.
#[derive(Debug)]
pub enum ArcActive {}

impl Property for ArcActive {
    type Key = ArcId;
    type Value = bool;
    const NAME: &'static str = "arc_active";
}

impl WritableProperty for ArcActive {}

/// Sparse map from handle to value for one property.
pub struct PropertyMap<P: Property> {
    values: BTreeMap<P::Key, P::Value>,
    _property: PhantomData<fn() -> P>,
}

impl<P: Property> PropertyMap<P> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            _property: PhantomData,
        }
    }

    /// Property name.
    pub fn name(&self) -> &'static str {
        P::NAME
    }

    /// Value for `key`, if set.
    pub fn get(&self, key: P::Key) -> Option<&P::Value> {
        self.values.get(&key)
    }

    /// Set the value for `key`, returning the previous one.
    pub fn set(&mut self, key: P::Key, value: P::Value) -> Option<P::Value> {
        self.values.insert(key, value)
    }

    /// Whether `key` has a value.
    pub fn contains(&self, key: P::Key) -> bool {
        self.values.contains_key(&key)
    }

    /// Number of keys with a value.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key has a value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (P::Key, &P::Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Keys whose value equals `value`, ascending.
    pub fn keys_with(&self, value: &P::Value) -> Vec<P::Key>
    where
        P::Value: PartialEq,
    {
        self.values
            .iter()
            .filter(|(_, v)| *v == value)
            .map(|(k, _)| *k)
            .collect()
    }
}

impl<P: Property> Default for PropertyMap<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Property> Clone for PropertyMap<P> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            _property: PhantomData,
        }
    }
}

impl<P: Property> fmt::Debug for PropertyMap<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMap")
            .field("name", &P::NAME)
            .field("values", &self.values)
            .finish()
    }
}

impl<P: Property> FromIterator<(P::Key, P::Value)> for PropertyMap<P> {
    fn from_iter<I: IntoIterator<Item = (P::Key, P::Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            _property: PhantomData,
        }
    }
}

struct RegistryEntry {
    name: &'static str,
    map: Box<dyn Any + Send + Sync>,
}

/// Type-indexed collection of property maps.
#[derive(Default)]
pub struct PropertyRegistry {
    entries: BTreeMap<TypeId, RegistryEntry>,
}

impl PropertyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `map` for `P`. Returns false (and keeps the existing map) if
    /// `P` is already registered.
    pub fn register<P: Property>(&mut self, map: PropertyMap<P>) -> bool {
        let key = TypeId::of::<P>();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(
            key,
            RegistryEntry {
                name: P::NAME,
                map: Box::new(map),
            },
        );
        true
    }

    /// Whether `P` is registered.
    pub fn contains<P: Property>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<P>())
    }

    /// Map for `P`.
    pub fn get<P: Property>(&self) -> Option<&PropertyMap<P>> {
        self.entries
            .get(&TypeId::of::<P>())
            .and_then(|e| e.map.downcast_ref::<PropertyMap<P>>())
    }

    /// Mutable map for `P`.
    pub fn get_mut<P: Property>(&mut self) -> Option<&mut PropertyMap<P>> {
        self.entries
            .get_mut(&TypeId::of::<P>())
            .and_then(|e| e.map.downcast_mut::<PropertyMap<P>>())
    }

    /// Registered property names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.values().map(|e| e.name).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRegistry")
            .field("properties", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::digraph::ListDigraph;

    enum Score {}

    impl Property for Score {
        type Key = NodeId;
        type Value = f64;
        const NAME: &'static str = "score";
    }

    fn nodes(n: usize) -> Vec<NodeId> {
        let mut g = ListDigraph::new();
        (0..n).map(|_| g.add_node()).collect()
    }

    #[test]
    fn test_map_is_sparse() {
        let ids = nodes(3);
        let mut map = PropertyMap::<NodeActive>::new();

        assert_eq!(map.set(ids[2], true), None);
        assert_eq!(map.set(ids[2], false), Some(true));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(ids[0]), None);
        assert_eq!(map.get(ids[2]), Some(&false));
        assert_eq!(map.name(), "node_active");
    }

    #[test]
    fn test_keys_with() {
        let ids = nodes(4);
        let map: PropertyMap<NodeTimestep> =
            [(ids[3], 1), (ids[0], 1), (ids[1], 2)].into_iter().collect();

        assert_eq!(map.keys_with(&1), vec![ids[0], ids[3]]);
        assert!(map.keys_with(&7).is_empty());
    }

    #[test]
    fn test_registry_typed_lookup() {
        let ids = nodes(1);
        let mut registry = PropertyRegistry::new();
        assert!(registry.register(PropertyMap::<NodeActive>::new()));
        assert!(registry.register(PropertyMap::<Score>::new()));
        assert!(!registry.register(PropertyMap::<Score>::new()));

        registry.get_mut::<Score>().unwrap().set(ids[0], 0.5);

        assert_eq!(registry.get::<Score>().unwrap().get(ids[0]), Some(&0.5));
        assert!(registry.get::<NodeActive>().unwrap().is_empty());
        assert!(registry.get::<ArcActive>().is_none());
        assert_eq!(registry.names(), vec!["node_active", "score"]);
    }
}
