//! Reactive Primitives
//!
//! This module implements the typed surface of the reactive system:
//! signals, computeds and effects, all backed by one [`Graph`].
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state and the only handle that can
//! be written. Writing it runs its effects and recomputes every computed
//! that declared it as a dependency, synchronously, before `set` returns.
//!
//! ## Computeds
//!
//! A Computed is a read-only value re-derived from the dependencies it was
//! declared with. It is recomputed eagerly on every write to one of them,
//! so reading it is always cheap and never stale.
//!
//! ## Effects
//!
//! An Effect is a callback subscribed to one or more signals or computeds.
//! It may return a cleanup that runs before its next invocation.
//!
//! # Implementation Notes
//!
//! Dependencies are declared explicitly at creation time. Nothing is
//! tracked while a computed or effect runs, and the dependency set of a
//! node never changes afterwards.

mod computed;
mod effect;
mod runtime;
mod signal;

pub use computed::Computed;
pub use effect::EffectOptions;
pub use runtime::{Dependency, Graph};
pub use signal::Signal;
