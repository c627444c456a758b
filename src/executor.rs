//! The node executor (§4.2): traverses a validated graph, invoking node
//! handlers and picking the next edge.

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::graph::Graph;

/// Runs a validated graph to completion against an initial state.
pub struct Executor<'g, S> {
    graph: &'g Graph<S>,
}

impl<'g, S> Executor<'g, S>
where
    S: Send + 'static,
{
    pub fn new(graph: &'g Graph<S>) -> Self {
        Self { graph }
    }

    /// Run with a freshly generated run id.
    pub async fn execute(&self, initial: S) -> Result<S> {
        self.execute_with_context(initial, NodeContext::new_run()).await
    }

    /// Run under a caller-supplied context, e.g. a sub-workflow sharing
    /// its parent's cancellation token, or a run id extracted from state.
    #[tracing::instrument(skip(self, initial, ctx), fields(run_id = %ctx.run_id()))]
    pub async fn execute_with_context(&self, initial: S, ctx: NodeContext) -> Result<S> {
        let entry = self
            .graph
            .entry_point()
            .ok_or_else(|| GraphError::Configuration("graph has no entry point".to_string()))?
            .to_string();

        let mut current = entry;
        let mut state = initial;

        loop {
            if ctx.is_cancelled() {
                return Err(GraphError::cancelled(&current));
            }

            let node = self
                .graph
                .node(&current)
                .ok_or_else(|| GraphError::UnknownNode(current.clone()))?;

            state = node.run(state, ctx.clone()).await?;

            if self.graph.is_exit_point(&current) {
                tracing::info!(node = %current, run_id = %ctx.run_id(), "run reached exit point");
                return Ok(state);
            }

            if ctx.is_cancelled() {
                return Err(GraphError::cancelled(&current));
            }

            match self.graph.next_edge(&current, &state)? {
                Some(edge) => {
                    tracing::debug!(from = %current, to = %edge.to, "following edge");
                    current = edge.to.clone();
                }
                None => {
                    return Err(GraphError::workflow(
                        &current,
                        "no matching outgoing edge for current state",
                    ))
                }
            }
        }
    }
}
