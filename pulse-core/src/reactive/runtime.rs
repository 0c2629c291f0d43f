//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, computeds
//! and effects. A [`Graph`] owns one node arena and runs the propagation
//! engine, the only code path that changes a stored value.
//!
//! # How It Works
//!
//! Every write goes through `commit_write`:
//!
//! 1. The old value becomes the node's previous value and the new one is
//!    stored.
//! 2. The node's effects run in registration order. Each entry's stored
//!    cleanup runs first, then the callback, whose returned cleanup is kept
//!    for next time.
//! 3. The node's neighbours are visited in link order. Every derived
//!    neighbour that declared the node as a dependency is recomputed and the
//!    result is committed by re-entering step 1 for that neighbour.
//!
//! The walk is a plain depth-first recursion on the call stack. A node
//! reachable along two paths is recomputed, and its effects fire, once per
//! path. There is no cycle detection: a cycle recurses until the stack runs
//! out.
//!
//! # Thread Safety
//!
//! The arena sits behind a mutex, so handles are `Send + Sync`. The lock is
//! never held while user code runs, which is what lets recompute closures
//! read other nodes and lets effects write back into the graph; such a
//! nested write completes before the outer walk moves on. Writers are not
//! arbitrated, though: two threads writing the same graph interleave at lock
//! granularity and see each other's partial propagation.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use crate::error::{GraphError, GraphResult};
use crate::graph::{EffectEntry, EffectId, GraphSnapshot, GraphState, NodeId, NodeKind, Value};

/// Anything that can be declared as a dependency of a computed or effect.
///
/// Implemented by [`Signal`](super::Signal) and [`Computed`](super::Computed),
/// so dependency lists can mix value types: `&[&count, &label]`.
pub trait Dependency {
    fn node_id(&self) -> NodeId;
}

/// Handle to a reactive graph.
///
/// Cloning the handle shares the graph.
#[derive(Clone)]
pub struct Graph {
    state: Arc<Mutex<GraphState>>,
}

impl Graph {
    /// Create a new, empty graph.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GraphState::new())),
        }
    }

    /// The process-wide graph used by the free functions of this crate.
    pub fn global() -> &'static Graph {
        static GLOBAL: OnceLock<Graph> = OnceLock::new();
        GLOBAL.get_or_init(Graph::new)
    }

    /// Whether two handles refer to the same graph.
    pub fn ptr_eq(&self, other: &Graph) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Lock the arena. Must not be held while user code runs.
    pub(crate) fn state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock()
    }

    /// Read the current value of a node.
    pub(crate) fn read<T>(&self, node_id: NodeId) -> GraphResult<T>
    where
        T: Clone + 'static,
    {
        let value = Arc::clone(self.state().node(node_id)?.value());
        downcast(node_id, &value)
    }

    /// Read the value a node held before its last write.
    pub(crate) fn read_previous<T>(&self, node_id: NodeId) -> GraphResult<Option<T>>
    where
        T: Clone + 'static,
    {
        let previous = self.state().node(node_id)?.previous().cloned();
        previous.map(|value| downcast(node_id, &value)).transpose()
    }

    /// Write a new value to a node and propagate it.
    pub(crate) fn write<T>(&self, node_id: NodeId, value: T) -> GraphResult<()>
    where
        T: Send + Sync + 'static,
    {
        self.commit_write(node_id, Arc::new(value))
    }

    /// Tear a node out of the graph.
    pub(crate) fn detach(&self, node_id: NodeId) -> GraphResult<()> {
        let node = self.state().detach(node_id)?;
        // Dropped with the lock released.
        drop(node);
        Ok(())
    }

    fn commit_write(&self, node_id: NodeId, value: Value) -> GraphResult<()> {
        let effect_ids = {
            let mut state = self.state();
            let node = state.node_mut(node_id)?;
            node.replace_value(value);
            node.effect_ids()
        };
        trace!(node = %node_id, effects = effect_ids.len(), "committed write");

        self.run_effects(node_id, &effect_ids);
        self.propagate(node_id)
    }

    fn run_effects(&self, node_id: NodeId, effect_ids: &[EffectId]) {
        for &effect_id in effect_ids {
            // Entries removed by an earlier callback are skipped.
            let prepared = self
                .state()
                .node_mut(node_id)
                .ok()
                .and_then(|node| node.effect_mut(effect_id))
                .map(EffectEntry::prepare_run);
            let Some((callback, pending)) = prepared else {
                continue;
            };

            if let Some(pending) = pending {
                pending();
            }
            trace!(node = %node_id, effect = %effect_id, "running effect");
            let next = callback();

            let mut state = self.state();
            if let Some(entry) = state
                .node_mut(node_id)
                .ok()
                .and_then(|node| node.effect_mut(effect_id))
            {
                entry.set_cleanup(next);
            }
        }
    }

    fn propagate(&self, node_id: NodeId) -> GraphResult<()> {
        let neighbours = self.state().links_of(node_id);
        // An effect may have detached the node already.
        let Ok(neighbours) = neighbours else {
            return Ok(());
        };

        for neighbour in neighbours {
            let recompute = {
                let state = self.state();
                if !state.is_linked(node_id, neighbour) {
                    continue;
                }
                state.recompute_on(neighbour, node_id)
            };
            let Some(recompute) = recompute else {
                continue;
            };

            trace!(node = %neighbour, from = %node_id, "recomputing derived node");
            let value = recompute();
            self.commit_write(neighbour, value)?;
        }
        Ok(())
    }

    /// Neighbours of a node, in link order.
    pub fn links_of(&self, node_id: NodeId) -> GraphResult<Vec<NodeId>> {
        Ok(self.state().links_of(node_id)?.to_vec())
    }

    pub fn kind_of(&self, node_id: NodeId) -> GraphResult<NodeKind> {
        Ok(self.state().node(node_id)?.kind())
    }

    /// Get the number of live nodes.
    pub fn node_count(&self) -> usize {
        self.state().node_count()
    }

    /// Capture the current structure of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.state().snapshot()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.node_count())
            .finish()
    }
}

fn downcast<T>(node: NodeId, value: &Value) -> GraphResult<T>
where
    T: Clone + 'static,
{
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or(GraphError::TypeMismatch {
            node,
            expected: type_name::<T>(),
        })
}
