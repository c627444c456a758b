//! Embeds a whole validated sub-graph over a different state type (§4.4.4).

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::executor::Executor;
use crate::graph::Graph;
use crate::node::NodeHandler;
use std::sync::Arc;

/// Runs a sub-graph `G'` against a mapped state type `S'`, translating
/// back into the parent's state type `S` on completion. The sub-workflow
/// shares no state with siblings; `cancel` propagates from the parent
/// context into the child run (§5).
pub struct SubWorkflowNode<S, S2> {
    name: String,
    sub_graph: Arc<Graph<S2>>,
    state_mapper: Arc<dyn Fn(&S) -> Option<S2> + Send + Sync>,
    result_mapper: Arc<dyn Fn(S2, &S) -> Option<S> + Send + Sync>,
}

impl<S, S2> SubWorkflowNode<S, S2>
where
    S: Send + 'static,
    S2: Send + 'static,
{
    pub fn new(
        name: impl Into<String>,
        sub_graph: Arc<Graph<S2>>,
        state_mapper: impl Fn(&S) -> Option<S2> + Send + Sync + 'static,
        result_mapper: impl Fn(S2, &S) -> Option<S> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            sub_graph,
            state_mapper: Arc::new(state_mapper),
            result_mapper: Arc::new(result_mapper),
        }
    }
}

#[async_trait::async_trait]
impl<S, S2> NodeHandler<S> for SubWorkflowNode<S, S2>
where
    S: Send + 'static,
    S2: Send + 'static,
{
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S> {
        let mapped = (self.state_mapper)(&state)
            .ok_or_else(|| GraphError::workflow(&self.name, "state mapper returned null"))?;

        let executor = Executor::new(&self.sub_graph);
        let sub_result = executor.execute_with_context(mapped, ctx.child()).await?;

        (self.result_mapper)(sub_result, &state)
            .ok_or_else(|| GraphError::workflow(&self.name, "result mapper returned null"))
    }
}
