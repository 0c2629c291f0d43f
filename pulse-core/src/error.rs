//! Error types for graph operations.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors produced when a handle or id cannot be resolved against a graph.
///
/// Writing to a [`Computed`](crate::reactive::Computed) is not an error
/// variant: the read-only view has no setter, so that mistake is caught by
/// the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node was torn down with `detach()` and must not be used again.
    #[error("node {0} has been detached from the graph")]
    Detached(NodeId),

    /// The node id was never registered with this graph.
    #[error("node {0} does not belong to this graph")]
    UnknownNode(NodeId),

    /// The stored value could not be viewed as the requested type.
    #[error("node {node} does not hold a value of type `{expected}`")]
    TypeMismatch {
        node: NodeId,
        expected: &'static str,
    },
}

/// Result alias used throughout the crate.
pub type GraphResult<T> = Result<T, GraphError>;

/// Unwraps a graph result for the panicking convenience accessors.
#[track_caller]
pub(crate) fn expect_live<T>(result: GraphResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}
