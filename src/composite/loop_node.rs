//! Conditional looping around a single child (§4.4.3).

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use std::sync::Arc;

type Predicate<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Repeats `child` while `continue_condition` holds, stopping on
/// `break_condition`, `max_iterations`, or a child failure (which
/// propagates — there is no implicit retry inside a loop).
pub struct LoopNode<S> {
    name: String,
    child: Arc<dyn NodeHandler<S>>,
    continue_condition: Predicate<S>,
    break_condition: Option<Predicate<S>>,
    max_iterations: Option<u64>,
}

impl<S> LoopNode<S>
where
    S: Send + 'static,
{
    pub fn new(
        name: impl Into<String>,
        child: Arc<dyn NodeHandler<S>>,
        continue_condition: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            child,
            continue_condition: Arc::new(continue_condition),
            break_condition: None,
            max_iterations: None,
        }
    }

    pub fn with_break_condition(mut self, condition: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        self.break_condition = Some(Arc::new(condition));
        self
    }

    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for LoopNode<S>
where
    S: Send + 'static,
{
    async fn call(&self, mut state: S, ctx: NodeContext) -> Result<S> {
        let mut iterations: u64 = 0;

        loop {
            if ctx.is_cancelled() {
                return Err(GraphError::cancelled(&self.name));
            }

            if let Some(max) = self.max_iterations {
                if iterations >= max {
                    tracing::warn!(node = %self.name, iterations, max, "loop reached max iterations, exiting");
                    return Ok(state);
                }
            }

            // break_condition is evaluated before continue_condition (§4.4.3).
            // An exception from break_condition is logged and treated as
            // false; an exception from continue_condition is fatal.
            if let Some(brk) = &self.break_condition {
                let broke = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| brk(&state)));
                match broke {
                    Ok(true) => {
                        tracing::debug!(node = %self.name, iterations, "loop break condition met");
                        return Ok(state);
                    }
                    Ok(false) => {}
                    Err(_) => {
                        tracing::warn!(node = %self.name, "break condition panicked, treating as false");
                    }
                }
            }

            let should_continue =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.continue_condition)(&state)))
                    .map_err(|_| GraphError::workflow(&self.name, "continue condition panicked"))?;
            if !should_continue {
                return Ok(state);
            }

            state = self.child.call(state, ctx.clone()).await?;
            iterations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeContext;
    use futures::future::BoxFuture;

    fn increment() -> Arc<dyn NodeHandler<i64>> {
        Arc::new(|state: i64, _ctx: NodeContext| -> BoxFuture<'static, Result<i64>> {
            Box::pin(async move { Ok(state + 1) })
        })
    }

    #[tokio::test]
    async fn test_loop_runs_until_continue_condition_false() {
        let node = LoopNode::new("loop", increment(), |s: &i64| *s < 5);
        let result = node.call(0, NodeContext::new_run()).await.unwrap();
        assert_eq!(result, 5);
    }

    #[tokio::test]
    async fn test_loop_stops_at_max_iterations() {
        let node = LoopNode::new("loop", increment(), |_: &i64| true).with_max_iterations(3);
        let result = node.call(0, NodeContext::new_run()).await.unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn test_break_condition_checked_before_continue_condition() {
        // continue_condition would panic if ever evaluated past n == 2;
        // break_condition fires first at n == 2, so it must never run.
        let node = LoopNode::new("loop", increment(), |s: &i64| {
            if *s >= 2 {
                panic!("continue_condition should not run once break_condition fires")
            }
            true
        })
        .with_break_condition(|s: &i64| *s >= 2);
        let result = node.call(0, NodeContext::new_run()).await.unwrap();
        assert_eq!(result, 2);
    }
}
