//! Effect Registration
//!
//! An effect is a side-effecting callback subscribed to one or more nodes.
//! It runs after every write to any of them.
//!
//! # How Effects Work
//!
//! 1. Registering an effect over N dependencies appends one independent
//!    entry to each of the N nodes. A write to one node runs only that
//!    node's entry.
//!
//! 2. With no dependencies the callback runs once, right away, and is never
//!    subscribed.
//!
//! 3. With `run_on_mount`, the callback also runs once at registration.
//!
//! # Cleanup
//!
//! A callback may return a [`Cleanup`](crate::Cleanup). The entry keeps
//! it and runs it just before the entry's next invocation. Cleanups returned
//! by the immediate runs (no dependencies, or on mount) are dropped without
//! being called, and so are the pending cleanups of a detached node.

use std::sync::Arc;

use smallvec::SmallVec;

use super::runtime::{Dependency, Graph};
use crate::error::{expect_live, GraphResult};
use crate::graph::{erase, EffectId, EffectOutput, NodeId};

/// Options for [`Graph::effect_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectOptions {
    /// Also run the callback once at registration.
    pub run_on_mount: bool,
}

impl EffectOptions {
    /// Options with `run_on_mount` set.
    pub fn on_mount() -> Self {
        Self { run_on_mount: true }
    }
}

impl Graph {
    /// Subscribe `callback` to a single node.
    ///
    /// The callback runs after every write to the node, never immediately.
    pub fn subscribe<F, R>(&self, dependency: &dyn Dependency, callback: F) -> GraphResult<EffectId>
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: EffectOutput,
    {
        self.state().subscribe(dependency.node_id(), erase(callback))
    }

    /// Run `callback` after every write to any of `dependencies`.
    ///
    /// # Panics
    ///
    /// Panics if a dependency is detached or belongs to another graph.
    #[track_caller]
    pub fn effect<F, R>(&self, callback: F, dependencies: &[&dyn Dependency])
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: EffectOutput,
    {
        self.effect_with(callback, dependencies, EffectOptions::default())
    }

    #[track_caller]
    pub fn effect_with<F, R>(
        &self,
        callback: F,
        dependencies: &[&dyn Dependency],
        options: EffectOptions,
    ) where
        F: Fn() -> R + Send + Sync + 'static,
        R: EffectOutput,
    {
        expect_live(self.try_effect_with(callback, dependencies, options));
    }

    /// Register an effect, returning one entry ID per dependency.
    ///
    /// Dependencies are checked before the callback runs for the first time.
    pub fn try_effect_with<F, R>(
        &self,
        callback: F,
        dependencies: &[&dyn Dependency],
        options: EffectOptions,
    ) -> GraphResult<Vec<EffectId>>
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: EffectOutput,
    {
        let callback = erase(callback);

        if dependencies.is_empty() {
            let _ = callback();
            return Ok(Vec::new());
        }

        let dependency_ids: SmallVec<[NodeId; 4]> =
            dependencies.iter().map(|dependency| dependency.node_id()).collect();
        self.state().ensure_live(&dependency_ids)?;

        if options.run_on_mount {
            let _ = callback();
        }

        let mut state = self.state();
        dependency_ids
            .iter()
            .map(|&node_id| state.subscribe(node_id, Arc::clone(&callback)))
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::{cleanup, Cleanup};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counter() -> (Arc<AtomicI32>, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        (count.clone(), count)
    }

    #[test]
    fn effect_runs_whenever_a_dependency_updates() {
        let graph = Graph::new();
        let a = graph.signal(1);
        let b = graph.signal(2);
        let (runs, runs_clone) = counter();

        graph.effect(
            move || {
                runs_clone.fetch_add(1, Ordering::SeqCst);
            },
            &[&a, &b],
        );

        a.set(0);
        b.set(0);

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn effect_without_dependencies_runs_once() {
        let graph = Graph::new();
        let a = graph.signal(1);
        let (runs, runs_clone) = counter();

        graph.effect(
            move || {
                runs_clone.fetch_add(1, Ordering::SeqCst);
            },
            &[],
        );
        a.set(2);
        a.set(3);

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_runs_on_mount_when_asked() {
        let graph = Graph::new();
        let a = graph.signal(1);
        let (runs, runs_clone) = counter();

        graph.effect_with(
            move || {
                runs_clone.fetch_add(1, Ordering::SeqCst);
            },
            &[&a],
            EffectOptions::on_mount(),
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        a.set(2);
        a.set(3);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cleanup_runs_before_next_invocation() {
        let graph = Graph::new();
        let a = graph.signal(1);
        let (runs, runs_clone) = counter();
        let (cleanups, cleanups_clone) = counter();

        graph.effect(
            move || -> Cleanup {
                runs_clone.fetch_add(1, Ordering::SeqCst);
                let cleanups = cleanups_clone.clone();
                cleanup(move || {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                })
            },
            &[&a],
        );

        a.set(2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);

        a.set(3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn entries_per_dependency_are_independent() {
        let graph = Graph::new();
        let a = graph.signal(1);
        let b = graph.signal(2);
        let (runs, runs_clone) = counter();
        let (cleanups, cleanups_clone) = counter();

        graph.effect(
            move || -> Cleanup {
                runs_clone.fetch_add(1, Ordering::SeqCst);
                let cleanups = cleanups_clone.clone();
                cleanup(move || {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                })
            },
            &[&a, &b],
        );

        b.set(0);
        a.set(0);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);

        a.set(5);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mount_cleanup_is_not_tracked() {
        let graph = Graph::new();
        let a = graph.signal(1);
        let (cleanups, cleanups_clone) = counter();

        graph.effect_with(
            move || {
                let cleanups = cleanups_clone.clone();
                Some(cleanup(move || {
                    cleanups.fetch_add(1, Ordering::SeqCst);
                }))
            },
            &[&a],
            EffectOptions::on_mount(),
        );

        a.set(2);
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);

        a.set(3);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_dependency_is_rejected_before_mount_run() {
        let graph = Graph::new();
        let foreign = Graph::new().signal(1);
        let (runs, runs_clone) = counter();

        let err = graph
            .try_effect_with(
                move || {
                    runs_clone.fetch_add(1, Ordering::SeqCst);
                },
                &[&foreign],
                EffectOptions::on_mount(),
            )
            .unwrap_err();

        assert_eq!(err, GraphError::UnknownNode(foreign.id()));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn one_entry_per_dependency() {
        let graph = Graph::new();
        let a = graph.signal(1);
        let b = graph.signal(2);

        let ids = graph
            .try_effect_with(|| {}, &[&a, &b], EffectOptions::default())
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        let snapshot = graph.snapshot();
        assert_eq!(snapshot.node(a.id()).unwrap().effect_count, 1);
        assert_eq!(snapshot.node(b.id()).unwrap().effect_count, 1);
    }

    #[test]
    fn nested_write_completes_before_outer_walk_resumes() {
        let graph = Graph::new();
        let trigger = graph.signal(0);
        let echo = graph.signal(0);
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let (e, l) = (echo.clone(), log.clone());
        graph.effect(
            move || {
                l.lock().push("outer start");
                e.set(1);
                l.lock().push("outer end");
            },
            &[&trigger],
        );
        let l = log.clone();
        graph.effect(move || l.lock().push("echo"), &[&echo]);
        let l = log.clone();
        graph.effect(move || l.lock().push("second"), &[&trigger]);

        trigger.set(1);

        assert_eq!(
            *log.lock(),
            vec!["outer start", "echo", "outer end", "second"]
        );
    }
}
