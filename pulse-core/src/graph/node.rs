//! Graph Nodes
//!
//! This module defines the cells that live in the dependency graph.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::effects::{EffectEntry, EffectId};

/// A type-erased cell value.
///
/// Values of every type share one arena; the typed views downcast on read.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Unique identifier for a node in the dependency graph.
///
/// An ID names the graph that allocated it and the node's position in that
/// graph's allocation order. IDs are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    graph: u64,
    index: u64,
}

impl NodeId {
    pub(crate) fn new(graph: u64, index: u64) -> Self {
        Self { graph, index }
    }

    /// Tag of the graph that allocated this ID.
    pub fn graph(&self) -> u64 {
        self.graph
    }

    /// Position of the node in its graph's allocation order.
    pub fn index(&self) -> u64 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.graph, self.index)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A source node (signal). Written directly by callers.
    Source,

    /// A derived node (computed). Rewritten by the engine whenever one of
    /// its declared dependencies is written.
    Derived,
}

/// A cell in the dependency graph.
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// What kind of node this is. Never changes.
    kind: NodeKind,

    /// The current value.
    value: Value,

    /// The value held before the most recent write.
    previous: Option<Value>,

    /// Symmetric neighbour set, in insertion order.
    links: IndexSet<NodeId>,

    /// Effects subscribed to this node, in registration order.
    effects: SmallVec<[EffectEntry; 2]>,
}

impl Node {
    fn new(id: NodeId, kind: NodeKind, value: Value, previous: Option<Value>) -> Self {
        Self {
            id,
            kind,
            value,
            previous,
            links: IndexSet::new(),
            effects: SmallVec::new(),
        }
    }

    /// Create a new source node. It has no previous value until written.
    pub fn source(id: NodeId, value: Value) -> Self {
        Self::new(id, NodeKind::Source, value, None)
    }

    /// Create a new derived node. The initial value doubles as its previous value.
    pub fn derived(id: NodeId, value: Value) -> Self {
        let previous = Some(Arc::clone(&value));
        Self::new(id, NodeKind::Derived, value, previous)
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn previous(&self) -> Option<&Value> {
        self.previous.as_ref()
    }

    /// Store a new value, keeping the old one as the previous value.
    pub(crate) fn replace_value(&mut self, value: Value) {
        let old = std::mem::replace(&mut self.value, value);
        self.previous = Some(old);
    }

    /// Add a neighbour. Returns false if the link already existed.
    pub(crate) fn add_link(&mut self, node_id: NodeId) -> bool {
        self.links.insert(node_id)
    }

    /// Remove a neighbour, keeping the order of the remaining links.
    pub(crate) fn remove_link(&mut self, node_id: NodeId) -> bool {
        self.links.shift_remove(&node_id)
    }

    /// Get all neighbours.
    pub fn links(&self) -> &IndexSet<NodeId> {
        &self.links
    }

    pub(crate) fn take_links(&mut self) -> IndexSet<NodeId> {
        std::mem::take(&mut self.links)
    }

    pub(crate) fn push_effect(&mut self, entry: EffectEntry) {
        self.effects.push(entry);
    }

    pub(crate) fn effect_mut(&mut self, effect_id: EffectId) -> Option<&mut EffectEntry> {
        self.effects.iter_mut().find(|entry| entry.id() == effect_id)
    }

    /// IDs of the subscribed effects, in registration order.
    pub fn effect_ids(&self) -> SmallVec<[EffectId; 4]> {
        self.effects.iter().map(EffectEntry::id).collect()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Drop every effect entry. Stored cleanups are dropped, not invoked.
    pub(crate) fn clear_effects(&mut self) {
        self.effects.clear();
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("has_previous", &self.previous.is_some())
            .field("links", &self.links)
            .field("effect_count", &self.effects.len())
            .finish()
    }
}
