//! Dependency Graph
//!
//! This module implements the storage side of the reactive runtime: the
//! cells, the symmetric links between them and the effects subscribed to
//! them.
//!
//! # Overview
//!
//! - Nodes are either sources (written by callers) or derived (rewritten by
//!   the propagation engine).
//! - A link between two nodes means each is aware of the other. Links are
//!   stored on both ends and never carry a direction.
//! - Each derived node additionally records which nodes it declared as
//!   dependencies, together with its recompute closure.
//!
//! # Design Decisions
//!
//! 1. All nodes live in one arena keyed by [`NodeId`], whatever the type of
//!    their value. Values are type-erased; the typed views in
//!    [`crate::reactive`] downcast on read.
//!
//! 2. Links use an insertion-ordered set, so propagation visits neighbours in
//!    the order they were linked.
//!
//! 3. The arena never runs user code. Callers clone closures out and run
//!    them with the arena unlocked.

mod arena;
mod effects;
mod node;

pub use arena::{GraphSnapshot, GraphState, NodeSnapshot, Recompute};
pub use effects::{cleanup, Cleanup, EffectEntry, EffectId, EffectOutput};
pub use node::{NodeId, NodeKind, Value};

pub(crate) use effects::erase;
