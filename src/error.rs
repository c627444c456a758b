//! Error taxonomy for graph construction and execution.
//!
//! Errors fall into the categories described in the design: structural
//! problems caught at build time ([`GraphError::Configuration`]) and
//! everything that can go wrong once a run is in flight
//! ([`GraphError::Workflow`] and its specializations).

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while building, validating or executing a [`crate::graph::Graph`].
#[derive(Error, Debug)]
pub enum GraphError {
    /// A structural invariant (§3 of the design) was violated: duplicate
    /// node names, a dangling edge endpoint, a missing entry/exit point,
    /// an unreachable node, or a non-exit node with no outgoing edge.
    #[error("graph configuration invalid: {0}")]
    Configuration(String),

    /// A node handler raised an error, a guard was the only candidate and
    /// threw, an edge could not be matched, a selector/validator/mapper
    /// returned an invalid value, or a HITL node timed out.
    #[error("workflow error in node '{node}': {message}")]
    Workflow { node: String, message: String },

    /// A [`crate::composite::retry::RetryNode`] exhausted all attempts.
    /// Always wraps the last attempt's error.
    #[error("retry exhausted for node '{node}' after {attempts} attempt(s): {source}")]
    RetryExhausted {
        node: String,
        attempts: u32,
        #[source]
        source: Box<GraphError>,
    },

    /// Cooperative cancellation fired while a node, retry sleep, parallel
    /// join, or HITL poll was in flight.
    #[error("cancelled in node '{node}'")]
    Cancelled { node: String },

    /// Node name referenced by an edge, entry point or exit point does not
    /// exist in the graph.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A node with this name already exists in the graph.
    #[error("duplicate node: {0}")]
    DuplicateNode(String),
}

impl GraphError {
    pub fn workflow(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Workflow {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(node: impl Into<String>) -> Self {
        Self::Cancelled { node: node.into() }
    }

    pub fn retry_exhausted(node: impl Into<String>, attempts: u32, source: GraphError) -> Self {
        Self::RetryExhausted {
            node: node.into(),
            attempts,
            source: Box::new(source),
        }
    }

    /// Name of the node the error originated in, if any.
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::Workflow { node, .. } => Some(node),
            Self::RetryExhausted { node, .. } => Some(node),
            Self::Cancelled { node } => Some(node),
            _ => None,
        }
    }

    /// True for [`GraphError::Cancelled`], used by composites that need to
    /// let cancellation pass through untouched instead of wrapping it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}
