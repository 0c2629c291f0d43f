//! Store adapter for host frameworks.
//!
//! A [`Store`] wraps an aggregate value (usually a struct) for a UI host
//! that re-renders on change. Every field write builds a shallow copy of the
//! aggregate with that field replaced, puts it in a fresh source cell,
//! detaches the old cell and asks the host to re-render once.
//!
//! The store is a versioned handle: it owns the current cell and a
//! generation counter bumped by every [`Store::replace`]. Hosts can compare
//! generations instead of cell identities to decide whether to re-render.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{expect_live, GraphResult};
use crate::reactive::{Graph, Signal};

type Rerender = Box<dyn Fn(u64) + Send + Sync>;

/// Aggregate state exposed to a host framework.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Form { number: i32, label: String }
///
/// let store = Store::new(&graph, Form { number: 1, label: "a".into() }, |generation| {
///     host.request_render(generation);
/// });
///
/// store.set_from(|form| &mut form.number, |n| n + 1);
/// assert_eq!(store.select(|form| form.number), 2);
/// ```
pub struct Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    graph: Graph,
    current: Mutex<Signal<T>>,
    generation: AtomicU64,
    rerender: Rerender,
}

impl<T> Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a store over `value` in `graph`.
    ///
    /// `rerender` is the host's re-render hook. It receives the store's new
    /// generation and is called exactly once per write.
    pub fn new<R>(graph: &Graph, value: T, rerender: R) -> Self
    where
        R: Fn(u64) + Send + Sync + 'static,
    {
        Self {
            graph: graph.clone(),
            current: Mutex::new(graph.signal(value)),
            generation: AtomicU64::new(0),
            rerender: Box::new(rerender),
        }
    }

    /// The whole aggregate. Does not re-render.
    pub fn get(&self) -> T {
        self.signal().get()
    }

    /// Read one part of the aggregate. Does not re-render.
    pub fn select<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.get())
    }

    /// Replace the field picked by `field` with `value`.
    pub fn set<V, L>(&self, field: L, value: V)
    where
        L: FnOnce(&mut T) -> &mut V,
    {
        self.set_from(field, |_| value)
    }

    /// Replace the field picked by `field` with `updater(current field)`.
    #[track_caller]
    pub fn set_from<V, L, U>(&self, field: L, updater: U)
    where
        L: FnOnce(&mut T) -> &mut V,
        U: FnOnce(&V) -> V,
    {
        let mut next = self.get();
        let slot = field(&mut next);
        *slot = updater(slot);

        let cell = self.graph.signal(next);
        expect_live(self.replace(cell));
    }

    /// Detach the current cell, swap in `cell` and re-render.
    ///
    /// If the current cell cannot be detached the store is left as it was,
    /// `cell` is detached instead and the host is not re-rendered.
    pub fn replace(&self, cell: Signal<T>) -> GraphResult<()> {
        let mut current = self.current.lock();
        if let Err(err) = current.detach() {
            // The rejected cell is already in the graph.
            let _ = cell.detach();
            return Err(err);
        }
        let old = std::mem::replace(&mut *current, cell);
        drop(current);

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(old = %old.id(), generation, "replaced store cell");
        (self.rerender)(generation);
        Ok(())
    }

    /// Number of replacements so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Handle to the current cell.
    pub fn signal(&self) -> Signal<T> {
        self.current.lock().clone()
    }
}

impl<T> Debug for Store<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("generation", &self.generation())
            .field("current", &self.signal())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use std::sync::atomic::AtomicI32;
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        number: i32,
        label: &'static str,
    }

    fn store_with_renders(graph: &Graph) -> (Store<Counter>, Arc<AtomicI32>) {
        let renders = Arc::new(AtomicI32::new(0));
        let renders_clone = renders.clone();
        let store = Store::new(
            graph,
            Counter {
                number: 1,
                label: "count",
            },
            move |_| {
                renders_clone.fetch_add(1, Ordering::SeqCst);
            },
        );
        (store, renders)
    }

    #[test]
    fn rerenders_once_per_write() {
        let graph = Graph::new();
        let (store, renders) = store_with_renders(&graph);

        for expected in 1..=3 {
            store.set_from(|c| &mut c.number, |n| n + 1);
            assert_eq!(renders.load(Ordering::SeqCst), expected);
        }

        assert_eq!(store.get().number, 4);
        assert_eq!(renders.load(Ordering::SeqCst), 3);
        assert_eq!(store.generation(), 3);
    }

    #[test]
    fn reads_do_not_rerender() {
        let graph = Graph::new();
        let (store, renders) = store_with_renders(&graph);

        assert_eq!(store.get().number, 1);
        assert_eq!(store.select(|c| c.label), "count");
        assert_eq!(renders.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn set_keeps_other_fields() {
        let graph = Graph::new();
        let (store, _) = store_with_renders(&graph);

        store.set(|c| &mut c.label, "total");

        assert_eq!(
            store.get(),
            Counter {
                number: 1,
                label: "total",
            }
        );
    }

    #[test]
    fn write_detaches_the_old_cell() {
        let graph = Graph::new();
        let (store, _) = store_with_renders(&graph);
        let old = store.signal();

        store.set(|c| &mut c.number, 10);

        assert_eq!(old.try_get(), Err(GraphError::Detached(old.id())));
        assert_ne!(store.signal().id(), old.id());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn many_writes_keep_one_live_cell() {
        let graph = Graph::new();
        let store = Store::new(&graph, 0_u32, |_| {});
        let first = store.signal();

        for i in 0..10_000 {
            store.set(|v| v, i);
        }

        assert_eq!(store.get(), 9_999);
        assert_eq!(store.generation(), 10_000);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(first.try_get(), Err(GraphError::Detached(first.id())));
    }

    #[test]
    fn failed_replace_leaves_store_unchanged() {
        let graph = Graph::new();
        let (store, renders) = store_with_renders(&graph);
        let stale = store.signal();
        stale.detach().unwrap();

        let rejected = graph.signal(Counter {
            number: 2,
            label: "count",
        });
        let err = store.replace(rejected.clone()).unwrap_err();

        assert_eq!(err, GraphError::Detached(stale.id()));
        assert_eq!(store.signal().id(), stale.id());
        assert_eq!(store.generation(), 0);
        assert_eq!(renders.load(Ordering::SeqCst), 0);
        assert_eq!(rejected.try_get(), Err(GraphError::Detached(rejected.id())));
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn rerender_receives_generation() {
        let graph = Graph::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let store = Store::new(&graph, 0_u8, move |generation| {
            seen_clone.lock().push(generation);
        });

        store.replace(graph.signal(1)).unwrap();
        store.replace(graph.signal(2)).unwrap();

        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(store.get(), 2);
    }
}
