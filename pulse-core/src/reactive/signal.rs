//! Signal Implementation
//!
//! A Signal is the read-write view of a source node. It is the only kind of
//! handle callers can write through; every write enters the propagation
//! engine.
//!
//! # Memory Layout
//!
//! A signal is a graph handle (one `Arc`) plus the node ID. The value lives
//! in the graph, so clones of a signal all see and write the same node.

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use super::runtime::{Dependency, Graph};
use crate::error::{expect_live, GraphResult};
use crate::graph::NodeId;

/// A writable reactive value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let graph = Graph::new();
/// let count = graph.signal(0);
///
/// count.set(5);
/// count.update(|n| n + 1);
/// assert_eq!(count.get(), 6);
/// assert_eq!(count.previous(), Some(5));
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    graph: Graph,
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl Graph {
    /// Create a source node holding `value` and return its writable view.
    pub fn signal<T>(&self, value: T) -> Signal<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let id = self.state().add_source(Arc::new(value));
        Signal {
            graph: self.clone(),
            id,
            _marker: PhantomData,
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Get the signal's node ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the graph this signal belongs to.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Get the current value.
    ///
    /// # Panics
    ///
    /// Panics if the signal has been detached.
    #[track_caller]
    pub fn get(&self) -> T {
        expect_live(self.try_get())
    }

    pub fn try_get(&self) -> GraphResult<T> {
        self.graph.read(self.id)
    }

    /// Get the value held before the last write, `None` if never written.
    ///
    /// # Panics
    ///
    /// Panics if the signal has been detached.
    #[track_caller]
    pub fn previous(&self) -> Option<T> {
        expect_live(self.graph.read_previous(self.id))
    }

    /// Set a new value, run this signal's effects and recompute everything
    /// derived from it before returning.
    ///
    /// # Panics
    ///
    /// Panics if the signal has been detached.
    #[track_caller]
    pub fn set(&self, value: T) {
        expect_live(self.try_set(value))
    }

    pub fn try_set(&self, value: T) -> GraphResult<()> {
        self.graph.write(self.id, value)
    }

    /// Set the value computed from the current one.
    ///
    /// The read and the write are two steps; another writer on the same
    /// graph may slip in between them.
    #[track_caller]
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get();
        self.set(f(&current));
    }

    /// Tear the signal out of the graph.
    ///
    /// Unlinks it from every neighbour and drops its effects without running
    /// their cleanups. Any later use of this signal, or of a clone of it,
    /// fails with [`GraphError::Detached`](crate::GraphError::Detached).
    pub fn detach(&self) -> GraphResult<()> {
        self.graph.detach(self.id)
    }
}

impl<T> Dependency for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn node_id(&self) -> NodeId {
        self.id
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            id: self.id,
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.try_get().ok())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
