//! The uniform node contract: `(state, context) -> state`.
//!
//! Every node in a graph, including every composite in [`crate::composite`]
//! and every human-in-the-loop node in [`crate::hitl`], implements
//! [`NodeHandler`]. The executor never distinguishes a "plain" node from a
//! composite one; composition is just nesting handlers.

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// The node contract from the design: an async, cancellable transform on
/// state. Implementations must honour `ctx`'s cancellation token at every
/// suspension point and must not mutate their input after returning.
#[async_trait::async_trait]
pub trait NodeHandler<S>: Send + Sync {
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S>;
}

/// Blanket impl so a plain async closure can be used wherever a
/// `NodeHandler` is expected, mirroring the teacher's `add_node(|state| ...)`
/// ergonomics.
#[async_trait::async_trait]
impl<S, F> NodeHandler<S> for F
where
    S: Send + 'static,
    F: Fn(S, NodeContext) -> BoxFuture<'static, Result<S>> + Send + Sync,
{
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S> {
        (self)(state, ctx).await
    }
}

/// Forwarding impl so a trait object can be passed wherever a `NodeHandler`
/// is expected (e.g. `Arc<dyn NodeHandler<S>>`).
#[async_trait::async_trait]
impl<S> NodeHandler<S> for Arc<dyn NodeHandler<S>>
where
    S: Send + 'static,
{
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S> {
        (**self).call(state, ctx).await
    }
}

/// A named node: the executor's unit of work. Wraps a handler with the
/// name/description metadata from §3 and enforces the base-node contract
/// from §4.3 — caller-thrown errors are annotated with the node name and
/// re-raised as [`GraphError::Workflow`] (unless already a `GraphError`
/// variant carrying its own node name, in which case it passes through).
pub struct Node<S> {
    pub name: String,
    pub description: Option<String>,
    handler: Arc<dyn NodeHandler<S>>,
}

impl<S> Clone for Node<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S> fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<S> Node<S>
where
    S: Send + 'static,
{
    pub fn new(name: impl Into<String>, handler: impl NodeHandler<S> + 'static) -> Self {
        Self {
            name: name.into(),
            description: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Run the handler, honouring cancellation and wrapping failures per
    /// the base-node contract (§4.3).
    pub async fn run(&self, state: S, ctx: NodeContext) -> Result<S> {
        if ctx.is_cancelled() {
            return Err(GraphError::cancelled(&self.name));
        }
        tracing::debug!(node = %self.name, run_id = %ctx.run_id(), "invoking node");
        let result = self.handler.call(state, ctx.clone()).await;
        match &result {
            Ok(_) => tracing::debug!(node = %self.name, run_id = %ctx.run_id(), "node completed"),
            Err(e) if e.is_cancelled() => {
                tracing::info!(node = %self.name, run_id = %ctx.run_id(), "node cancelled")
            }
            Err(e) => tracing::warn!(node = %self.name, run_id = %ctx.run_id(), error = %e, "node failed"),
        }
        result.map_err(|e| annotate(&self.name, e))
    }
}

/// Re-raise `err` as a [`GraphError::Workflow`] naming `node`, unless it
/// already names a node (composites set this themselves when they want a
/// more specific wrapper, e.g. `RetryExhausted`).
fn annotate(node: &str, err: GraphError) -> GraphError {
    match err {
        GraphError::Workflow { .. }
        | GraphError::RetryExhausted { .. }
        | GraphError::Cancelled { .. } => err,
        other => GraphError::workflow(node, other.to_string()),
    }
}
