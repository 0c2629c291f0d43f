//! Pulse Core
//!
//! This crate provides a small synchronous reactive runtime:
//!
//! - Signals: writable cells that notify dependents when they change
//! - Computeds: read-only cells re-derived eagerly from declared dependencies
//! - Effects: callbacks run after every write to their dependencies, with
//!   optional cleanup
//!
//! Dependencies are declared explicitly. A write runs to completion,
//! including every effect and every recomputation it reaches, before
//! returning to the caller.
//!
//! # Architecture
//!
//! - `graph`: node storage, symmetric links, effect entries and teardown
//! - `reactive`: the typed views and the propagation engine
//! - `store`: an adapter exposing aggregate state to a host framework
//!
//! # Example
//!
//! ```rust
//! use pulse_core::Graph;
//!
//! let graph = Graph::new();
//!
//! // Create a signal
//! let count = graph.signal(0);
//!
//! // Create a derived value
//! let c = count.clone();
//! let doubled = graph.computed(move || c.get() * 2, &[&count]);
//!
//! // Create an effect
//! let d = doubled.clone();
//! graph.effect(move || println!("Doubled: {}", d.get()), &[&doubled]);
//!
//! // Update the signal
//! count.set(5);
//! // The effect has already run and printed "Doubled: 10"
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod error;
mod graph;
pub mod reactive;
pub mod store;

pub use error::{GraphError, GraphResult};
pub use graph::{
    cleanup, Cleanup, EffectId, EffectOutput, GraphSnapshot, NodeId, NodeKind, NodeSnapshot,
};
pub use reactive::{Computed, Dependency, EffectOptions, Graph, Signal};
pub use store::Store;

/// Create a signal in the [global graph](Graph::global).
pub fn signal<T>(value: T) -> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    Graph::global().signal(value)
}

/// Create a computed in the [global graph](Graph::global).
#[track_caller]
pub fn computed<T, F>(derive: F, dependencies: &[&dyn Dependency]) -> Computed<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Graph::global().computed(derive, dependencies)
}

/// Register an effect in the [global graph](Graph::global).
#[track_caller]
pub fn effect<F, R>(callback: F, dependencies: &[&dyn Dependency])
where
    F: Fn() -> R + Send + Sync + 'static,
    R: EffectOutput,
{
    Graph::global().effect(callback, dependencies)
}

/// Register an effect with options in the [global graph](Graph::global).
#[track_caller]
pub fn effect_with<F, R>(callback: F, dependencies: &[&dyn Dependency], options: EffectOptions)
where
    F: Fn() -> R + Send + Sync + 'static,
    R: EffectOutput,
{
    Graph::global().effect_with(callback, dependencies, options)
}
