//! Node Arena
//!
//! The arena owns every node of a graph, indexed by ID, together with the
//! derivations of the derived nodes. It maintains the symmetric link
//! registry and performs teardown.
//!
//! # Links and derivations
//!
//! Links are purely symmetric: linking a computed to its dependencies adds
//! each side to the other's neighbour set. Which neighbour reads which is
//! kept apart from the links, in the [`Derivation`] stored for every derived
//! node. The propagation engine walks the links and asks the arena whether a
//! neighbour derives from the node that was just written.
//!
//! Nothing here runs user code. Recompute closures and effect callbacks are
//! cloned out so the caller can run them after releasing the graph lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::effects::{EffectEntry, EffectFn, EffectId};
use super::node::{Node, NodeId, NodeKind, Value};
use crate::error::{GraphError, GraphResult};

/// Re-derives the value of a derived node.
pub type Recompute = Arc<dyn Fn() -> Value + Send + Sync>;

/// How a derived node gets its value: the closure and the nodes it declared
/// as dependencies, in declaration order.
struct Derivation {
    recompute: Recompute,
    dependencies: SmallVec<[NodeId; 4]>,
}

/// IDs handed out so far by the arena tagged `graph`.
#[derive(Debug, Clone, Copy)]
struct Allocator {
    graph: u64,
    next_index: u64,
}

impl Allocator {
    fn new() -> Self {
        static GRAPHS: AtomicU64 = AtomicU64::new(0);
        Self {
            graph: GRAPHS.fetch_add(1, Ordering::Relaxed),
            next_index: 0,
        }
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId::new(self.graph, self.next_index);
        self.next_index += 1;
        id
    }

    /// Error for an ID with no live node. Every ID this arena allocated and
    /// no longer holds was detached.
    fn missing(&self, node_id: NodeId) -> GraphError {
        if node_id.graph() == self.graph && node_id.index() < self.next_index {
            GraphError::Detached(node_id)
        } else {
            GraphError::UnknownNode(node_id)
        }
    }
}

/// All nodes of one graph.
pub struct GraphState {
    /// All nodes in the graph, indexed by ID.
    nodes: HashMap<NodeId, Node>,

    /// Recompute closures of derived nodes, keyed by node.
    derivations: HashMap<NodeId, Derivation>,

    ids: Allocator,
}

impl GraphState {
    /// Create a new empty arena with its own ID space.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            derivations: HashMap::new(),
            ids: Allocator::new(),
        }
    }

    /// Add a source node holding `value`.
    pub fn add_source(&mut self, value: Value) -> NodeId {
        let id = self.ids.allocate();
        let node = Node::source(id, value);
        self.nodes.insert(id, node);
        debug!(node = %id, "created source node");
        id
    }

    /// Add a derived node holding its initial `value` and link it to
    /// `dependencies`.
    ///
    /// Fails without touching the arena if any dependency is unknown.
    pub fn add_derived(
        &mut self,
        value: Value,
        recompute: Recompute,
        dependencies: &[NodeId],
    ) -> GraphResult<NodeId> {
        self.ensure_live(dependencies)?;

        let id = self.ids.allocate();
        let node = Node::derived(id, value);
        self.nodes.insert(id, node);

        let mut declared: SmallVec<[NodeId; 4]> = SmallVec::new();
        for &dependency in dependencies {
            if !declared.contains(&dependency) {
                declared.push(dependency);
            }
        }
        self.derivations.insert(
            id,
            Derivation {
                recompute,
                dependencies: declared,
            },
        );

        self.link(id, dependencies)?;
        debug!(node = %id, dependencies = dependencies.len(), "created derived node");
        Ok(id)
    }

    /// Get a reference to a node.
    pub fn node(&self, node_id: NodeId) -> GraphResult<&Node> {
        self.nodes
            .get(&node_id)
            .ok_or_else(|| self.ids.missing(node_id))
    }

    /// Get a mutable reference to a node.
    pub fn node_mut(&mut self, node_id: NodeId) -> GraphResult<&mut Node> {
        let ids = self.ids;
        self.nodes
            .get_mut(&node_id)
            .ok_or_else(|| ids.missing(node_id))
    }

    /// Check that every id refers to a live node of this arena.
    pub fn ensure_live(&self, node_ids: &[NodeId]) -> GraphResult<()> {
        node_ids
            .iter()
            .try_for_each(|&node_id| self.node(node_id).map(|_| ()))
    }

    /// Link `node_id` symmetrically with each of `others`.
    ///
    /// Re-linking an existing pair is a no-op.
    pub fn link(&mut self, node_id: NodeId, others: &[NodeId]) -> GraphResult<()> {
        self.ensure_live(others)?;
        self.node(node_id)?;

        for &other in others {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.add_link(other);
            }
            if let Some(node) = self.nodes.get_mut(&other) {
                node.add_link(node_id);
            }
        }
        Ok(())
    }

    /// Neighbours of a node, in link insertion order.
    pub fn links_of(&self, node_id: NodeId) -> GraphResult<SmallVec<[NodeId; 8]>> {
        Ok(self.node(node_id)?.links().iter().copied().collect())
    }

    pub fn is_linked(&self, node_id: NodeId, other: NodeId) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|node| node.links().contains(&other))
    }

    /// The recompute closure of `node_id` if it is a derived node that
    /// declared `written` as a dependency.
    pub fn recompute_on(&self, node_id: NodeId, written: NodeId) -> Option<Recompute> {
        let node = self.nodes.get(&node_id)?;
        if node.kind() != NodeKind::Derived {
            return None;
        }
        self.derivations
            .get(&node_id)
            .filter(|derivation| derivation.dependencies.contains(&written))
            .map(|derivation| Arc::clone(&derivation.recompute))
    }

    /// Append an effect entry to a node.
    pub fn subscribe(&mut self, node_id: NodeId, callback: EffectFn) -> GraphResult<EffectId> {
        let entry = EffectEntry::new(callback);
        let effect_id = entry.id();
        self.node_mut(node_id)?.push_effect(entry);
        debug!(node = %node_id, effect = %effect_id, "subscribed effect");
        Ok(effect_id)
    }

    /// Remove a node from the graph.
    ///
    /// Removes it from every neighbour's link set and from the neighbours'
    /// declared dependencies, and forgets its derivation. The node is handed
    /// back with its effects already cleared, so pending cleanups are dropped
    /// without ever running. Nothing is recomputed.
    pub fn detach(&mut self, node_id: NodeId) -> GraphResult<Node> {
        let ids = self.ids;
        let mut node = self
            .nodes
            .remove(&node_id)
            .ok_or_else(|| ids.missing(node_id))?;
        node.clear_effects();

        for neighbour_id in node.take_links() {
            if let Some(neighbour) = self.nodes.get_mut(&neighbour_id) {
                neighbour.remove_link(node_id);
            }
            if let Some(derivation) = self.derivations.get_mut(&neighbour_id) {
                derivation.dependencies.retain(|dependency| *dependency != node_id);
            }
        }

        self.derivations.remove(&node_id);
        debug!(node = %node_id, "detached node");
        Ok(node)
    }

    /// Get the total number of live nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Capture the structure of the graph, ordered by node ID.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<NodeSnapshot> = self
            .nodes
            .values()
            .map(|node| NodeSnapshot {
                id: node.id(),
                kind: node.kind(),
                links: node.links().iter().copied().collect(),
                dependencies: self
                    .derivations
                    .get(&node.id())
                    .map(|derivation| derivation.dependencies.to_vec())
                    .unwrap_or_default(),
                effect_count: node.effect_count(),
            })
            .collect();
        nodes.sort_by_key(|node| node.id);
        GraphSnapshot { nodes }
    }
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: NodeKind,
    pub links: Vec<NodeId>,
    /// Declared dependencies; empty for source nodes.
    pub dependencies: Vec<NodeId>,
    pub effect_count: usize,
}

/// Serializable view of a whole graph, for debugging and assertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeSnapshot>,
}

impl GraphSnapshot {
    pub fn node(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Whether every link appears on both of its ends.
    pub fn links_are_symmetric(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.links.iter().all(|other| {
                self.node(*other)
                    .is_some_and(|neighbour| neighbour.links.contains(&node.id))
            })
        })
    }
}
