//! Effect entries stored on graph nodes.
//!
//! An effect subscribed to a node becomes one [`EffectEntry`] in that node's
//! ordered effect list. The entry pairs the callback with the cleanup returned
//! by its most recent run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cleanup returned by an effect run, invoked before the entry's next run.
pub type Cleanup = Box<dyn FnOnce() + Send>;

/// A subscribed effect callback.
pub type EffectFn = Arc<dyn Fn() -> Option<Cleanup> + Send + Sync>;

/// Box a closure as a [`Cleanup`].
///
/// ```rust,ignore
/// graph.effect(|| cleanup(|| println!("bye")), &[&count]);
/// ```
pub fn cleanup<F>(f: F) -> Cleanup
where
    F: FnOnce() + Send + 'static,
{
    Box::new(f)
}

/// Values an effect callback may return.
///
/// Lets callers write plain `|| { ... }` effects as well as effects that hand
/// back a cleanup.
pub trait EffectOutput {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl EffectOutput for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl EffectOutput for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl EffectOutput for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

/// Erase a typed effect callback into an [`EffectFn`].
pub(crate) fn erase<F, R>(callback: F) -> EffectFn
where
    F: Fn() -> R + Send + Sync + 'static,
    R: EffectOutput,
{
    Arc::new(move || callback().into_cleanup())
}

/// Unique identifier for a subscribed effect entry.
///
/// Subscribing one callback to several nodes yields one id per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect#{}", self.0)
    }
}

/// One subscription of a callback to a node.
pub struct EffectEntry {
    id: EffectId,
    callback: EffectFn,
    /// Cleanup returned by the most recent run, if any.
    cleanup: Option<Cleanup>,
}

impl EffectEntry {
    pub fn new(callback: EffectFn) -> Self {
        Self {
            id: EffectId::new(),
            callback,
            cleanup: None,
        }
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Clone out the callback and take the pending cleanup, so both can run
    /// without borrowing the graph.
    pub(crate) fn prepare_run(&mut self) -> (EffectFn, Option<Cleanup>) {
        (Arc::clone(&self.callback), self.cleanup.take())
    }

    pub(crate) fn set_cleanup(&mut self, cleanup: Option<Cleanup>) {
        self.cleanup = cleanup;
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }
}

impl fmt::Debug for EffectEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectEntry")
            .field("id", &self.id)
            .field("has_cleanup", &self.has_cleanup())
            .finish()
    }
}
