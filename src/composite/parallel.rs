//! Fan-out to `k` children concurrently with a quorum policy (§4.4.1).

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Quorum policy controlling how many children must succeed before the
/// parallel node returns, and what happens to the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParallelMode {
    /// Await every child; fail if any child fails.
    All,
    /// Await the first success; cancel the remaining children.
    Any,
    /// Await `floor(k/2) + 1` successes; cancel the rest.
    Majority,
    /// Await exactly `n` successes (`1 <= n <= k`); cancel the rest.
    Count(usize),
}

/// Fans out to `k >= 1` children, each receiving an independent clone of
/// the input state (§5 "State isolation for fan-out"). On success the
/// returned state is defined by `mode`; on a required-child failure the
/// other children are cancelled and the first error surfaces.
pub struct ParallelNode<S> {
    name: String,
    children: Vec<Arc<dyn NodeHandler<S>>>,
    mode: ParallelMode,
}

impl<S> std::fmt::Debug for ParallelNode<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelNode")
            .field("name", &self.name)
            .field("children", &self.children.len())
            .field("mode", &self.mode)
            .finish()
    }
}

impl<S> ParallelNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn NodeHandler<S>>>, mode: ParallelMode) -> Result<Self> {
        let name = name.into();
        if children.is_empty() {
            return Err(GraphError::Configuration(format!(
                "ParallelNode '{name}' requires at least one child"
            )));
        }
        if let ParallelMode::Count(n) = mode {
            if n == 0 || n > children.len() {
                return Err(GraphError::Configuration(format!(
                    "ParallelNode '{name}' Count({n}) out of range for {} children",
                    children.len()
                )));
            }
        }
        Ok(Self { name, children, mode })
    }

    fn required(&self) -> usize {
        let k = self.children.len();
        match self.mode {
            ParallelMode::All => k,
            ParallelMode::Any => 1,
            ParallelMode::Majority => k / 2 + 1,
            ParallelMode::Count(n) => n,
        }
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for ParallelNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S> {
        let required = self.required();
        let mut join_set: JoinSet<Result<(usize, S)>> = JoinSet::new();

        for (index, child) in self.children.iter().cloned().enumerate() {
            let child_state = state.clone();
            let child_ctx = ctx.child();
            join_set.spawn(async move {
                child
                    .call(child_state, child_ctx)
                    .await
                    .map(|s| (index, s))
            });
        }

        let mut completed: Vec<Option<S>> = vec![None; self.children.len()];
        let mut successes = 0usize;
        let mut failures = 0usize;
        let mut first_error: Option<GraphError> = None;
        let mut last_success_index: Option<usize> = None;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok((index, child_state))) => {
                    successes += 1;
                    last_success_index = Some(index);
                    completed[index] = Some(child_state);
                    tracing::debug!(node = %self.name, child = index, successes, required, "child completed");
                    if successes >= required {
                        break;
                    }
                }
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(node = %self.name, error = %e, "child failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    // Only a failure that makes the quorum unreachable aborts early.
                    let remaining_in_flight = self.children.len() - successes - failures;
                    if successes + remaining_in_flight < required {
                        break;
                    }
                }
                Err(join_err) => {
                    return Err(GraphError::workflow(
                        &self.name,
                        format!("child task panicked: {join_err}"),
                    ));
                }
            }
        }

        join_set.abort_all();

        if successes < required {
            return Err(first_error.unwrap_or_else(|| {
                GraphError::workflow(&self.name, "parallel node could not reach required quorum")
            }));
        }

        let result = match self.mode {
            // Stable, declaration-order policy for All (§9 Design Notes:
            // "last completed child" is non-deterministic, so this port
            // prescribes last-in-declaration-order instead).
            ParallelMode::All => completed
                .into_iter()
                .rev()
                .find_map(|s| s)
                .expect("All quorum implies every child completed"),
            ParallelMode::Any | ParallelMode::Majority | ParallelMode::Count(_) => {
                let index = last_success_index.expect("quorum reached implies a last success index");
                completed[index].take().expect("last successful child state")
            }
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeContext;
    use futures::future::BoxFuture;

    fn child(value: i64, fail: bool) -> Arc<dyn NodeHandler<i64>> {
        Arc::new(move |_state: i64, _ctx: NodeContext| -> BoxFuture<'static, Result<i64>> {
            Box::pin(async move {
                if fail {
                    Err(GraphError::workflow("child", "boom"))
                } else {
                    Ok(value)
                }
            })
        })
    }

    #[test]
    fn test_new_rejects_empty_children() {
        let err = ParallelNode::new("p", Vec::<Arc<dyn NodeHandler<i64>>>::new(), ParallelMode::All).unwrap_err();
        assert!(matches!(err, GraphError::Configuration(_)));
    }

    #[test]
    fn test_new_rejects_count_out_of_range() {
        let children = vec![child(1, false), child(2, false)];
        let err = ParallelNode::new("p", children, ParallelMode::Count(5)).unwrap_err();
        assert!(matches!(err, GraphError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_all_mode_returns_last_in_declaration_order() {
        let children = vec![child(1, false), child(2, false), child(3, false)];
        let node = ParallelNode::new("p", children, ParallelMode::All).unwrap();
        let result = node.call(0, NodeContext::new_run()).await.unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn test_all_mode_fails_if_any_child_fails() {
        let children = vec![child(1, false), child(2, true), child(3, false)];
        let node = ParallelNode::new("p", children, ParallelMode::All).unwrap();
        assert!(node.call(0, NodeContext::new_run()).await.is_err());
    }

    #[tokio::test]
    async fn test_majority_mode_reaches_quorum_despite_one_failure() {
        let children = vec![child(1, false), child(2, true), child(3, false)];
        let node = ParallelNode::new("p", children, ParallelMode::Majority).unwrap();
        assert!(node.call(0, NodeContext::new_run()).await.is_ok());
    }

    #[tokio::test]
    async fn test_any_mode_succeeds_with_single_success() {
        let children = vec![child(1, true), child(2, false), child(3, true)];
        let node = ParallelNode::new("p", children, ParallelMode::Any).unwrap();
        let result = node.call(0, NodeContext::new_run()).await.unwrap();
        assert_eq!(result, 2);
    }
}
