//! Computed Implementation
//!
//! A Computed is the read-only view of a derived node: a value re-derived
//! from explicitly declared dependencies.
//!
//! # How Computeds Work
//!
//! 1. On creation, the derive function runs once and its result becomes
//!    both the value and the previous value.
//!
//! 2. The node is linked to every declared dependency.
//!
//! 3. Whenever a dependency is written, the engine runs the derive function
//!    again and commits the result, firing the computed's effects and
//!    recomputing whatever derives from it in turn.
//!
//! Computeds are eager. A read never recomputes; it returns the value left
//! behind by the last propagation, which is always current.
//!
//! There is no setter. Trying to write through a `Computed` does not compile:
//!
//! ```compile_fail
//! use pulse_core::Graph;
//!
//! let graph = Graph::new();
//! let count = graph.signal(1);
//! let c = count.clone();
//! let doubled = graph.computed(move || c.get() * 2, &[&count]);
//! doubled.set(4);
//! ```

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use smallvec::SmallVec;

use super::runtime::{Dependency, Graph};
use crate::error::{expect_live, GraphResult};
use crate::graph::{NodeId, Recompute, Value};

/// A read-only value derived from other nodes.
pub struct Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    graph: Graph,
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl Graph {
    /// Create a derived node from `derive` and the nodes it reads.
    ///
    /// `derive` runs once now, and again after every write to any of
    /// `dependencies`. Reads inside `derive` are not tracked; a node that is
    /// read but not listed will not trigger recomputation.
    ///
    /// # Panics
    ///
    /// Panics if a dependency is detached or belongs to another graph.
    #[track_caller]
    pub fn computed<T, F>(&self, derive: F, dependencies: &[&dyn Dependency]) -> Computed<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        expect_live(self.try_computed(derive, dependencies))
    }

    pub fn try_computed<T, F>(
        &self,
        derive: F,
        dependencies: &[&dyn Dependency],
    ) -> GraphResult<Computed<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let dependency_ids: SmallVec<[NodeId; 4]> =
            dependencies.iter().map(|dependency| dependency.node_id()).collect();
        self.state().ensure_live(&dependency_ids)?;

        let initial: Value = Arc::new(derive());
        let recompute: Recompute = Arc::new(move || Arc::new(derive()) as Value);
        let id = self
            .state()
            .add_derived(initial, recompute, &dependency_ids)?;

        Ok(Computed {
            graph: self.clone(),
            id,
            _marker: PhantomData,
        })
    }
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Get the computed's node ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Get the current value. Never recomputes.
    ///
    /// # Panics
    ///
    /// Panics if the computed has been detached.
    #[track_caller]
    pub fn get(&self) -> T {
        expect_live(self.try_get())
    }

    pub fn try_get(&self) -> GraphResult<T> {
        self.graph.read(self.id)
    }

    /// Get the value held before the last recomputation. Before any
    /// recomputation this is the initial value.
    ///
    /// # Panics
    ///
    /// Panics if the computed has been detached.
    #[track_caller]
    pub fn previous(&self) -> Option<T> {
        expect_live(self.graph.read_previous(self.id))
    }

    /// Tear the computed out of the graph. It stops recomputing and its
    /// effects are dropped without running their cleanups.
    pub fn detach(&self) -> GraphResult<()> {
        self.graph.detach(self.id)
    }
}

impl<T> Dependency for Computed<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn node_id(&self) -> NodeId {
        self.id
    }
}

impl<T> Clone for Computed<T>
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

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id)
            .field("value", &self.try_get().ok())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
