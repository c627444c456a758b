//! Bounded retry with exponential backoff around a single child (§4.4.2).

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Retry parameters. Delay after attempt `i` is
/// `initial_delay * backoff_multiplier^(i-1)`, matching §4.4.2 exactly.
/// Jitter is off by default — the design's testable property "sleeps of
/// ~10ms then ~20ms" (§8 scenario 3) assumes an exact schedule — but can
/// be opted into via [`RetryPolicy::with_jitter`] for callers who want to
/// avoid synchronized retry storms across many concurrent runs.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        assert!(max_retries >= 1, "maxRetries must be >= 1");
        assert!(backoff_multiplier > 0.0, "backoffMultiplier must be > 0");
        Self {
            max_retries,
            initial_delay,
            backoff_multiplier,
            jitter: false,
        }
    }

    /// Opt into +/-25% randomized jitter on every computed delay.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi((attempt - 1) as i32);
        let base = self.initial_delay.as_secs_f64() * factor;
        let delay = if self.jitter {
            let spread = rand::random::<f64>() * 0.5 - 0.25;
            (base * (1.0 + spread)).max(0.0)
        } else {
            base
        };
        Duration::from_secs_f64(delay)
    }
}

/// Wraps a child node, retrying on failure per `policy` unless
/// `retry_predicate` returns false for the error, in which case it
/// propagates immediately (§4.4.2's `NonRetryable` path).
pub struct RetryNode<S> {
    name: String,
    child: Arc<dyn NodeHandler<S>>,
    policy: RetryPolicy,
    retry_predicate: Option<Arc<dyn Fn(&GraphError) -> bool + Send + Sync>>,
}

impl<S> RetryNode<S>
where
    S: Clone + Send + 'static,
{
    pub fn new(name: impl Into<String>, child: Arc<dyn NodeHandler<S>>, policy: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            child,
            policy,
            retry_predicate: None,
        }
    }

    pub fn with_retry_predicate(mut self, predicate: impl Fn(&GraphError) -> bool + Send + Sync + 'static) -> Self {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for RetryNode<S>
where
    S: Clone + Send + 'static,
{
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S> {
        let attempts = self.policy.max_retries + 1;
        let mut last_error: Option<GraphError> = None;

        for attempt in 1..=attempts {
            if ctx.is_cancelled() {
                return Err(GraphError::cancelled(&self.name));
            }

            tracing::debug!(node = %self.name, attempt, attempts, "retry attempt");
            match self.child.call(state.clone(), ctx.clone()).await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::info!(node = %self.name, attempt, "retry succeeded");
                    }
                    return Ok(result);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    let retryable = self.retry_predicate.as_ref().map(|p| p(&e)).unwrap_or(true);
                    if !retryable {
                        tracing::debug!(node = %self.name, error = %e, "non-retryable error, propagating");
                        return Err(e);
                    }
                    if attempt == attempts {
                        last_error = Some(e);
                        break;
                    }
                    let delay = self.policy.delay_after(attempt);
                    tracing::warn!(node = %self.name, attempt, delay_ms = delay.as_millis(), error = %e, "attempt failed, backing off");
                    last_error = Some(e);
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = ctx.cancel_token().cancelled() => {
                            return Err(GraphError::cancelled(&self.name));
                        }
                    }
                }
            }
        }

        Err(GraphError::retry_exhausted(
            &self.name,
            attempts,
            last_error.expect("loop always records an error before exhausting"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeContext;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyNode {
        fail_times: u32,
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl NodeHandler<i64> for FlakyNode {
        async fn call(&self, state: i64, _ctx: NodeContext) -> Result<i64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_times {
                Err(GraphError::workflow("flaky", "not yet"))
            } else {
                Ok(state)
            }
        }
    }

    #[test]
    fn test_delay_after_is_exact_exponential_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10), 2.0);
        assert_eq!(policy.delay_after(1), Duration::from_millis(10));
        assert_eq!(policy.delay_after(2), Duration::from_millis(20));
        assert_eq!(policy.delay_after(3), Duration::from_millis(40));
    }

    #[test]
    fn test_jitter_stays_within_the_configured_spread() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0).with_jitter(true);
        for _ in 0..50 {
            let delay = policy.delay_after(1).as_secs_f64();
            assert!((75.0 / 1000.0..=125.0 / 1000.0).contains(&delay));
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let child: Arc<dyn NodeHandler<i64>> = Arc::new(FlakyNode {
            fail_times: 2,
            calls: AtomicU32::new(0),
        });
        let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0);
        let node = RetryNode::new("retry", child, policy);
        let result = node.call(1, NodeContext::new_run()).await.unwrap();
        assert_eq!(result, 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted_reports_attempt_count() {
        let child: Arc<dyn NodeHandler<i64>> = Arc::new(FlakyNode {
            fail_times: 100,
            calls: AtomicU32::new(0),
        });
        let policy = RetryPolicy::new(2, Duration::from_millis(1), 2.0);
        let node = RetryNode::new("retry", child, policy);
        let err = node.call(1, NodeContext::new_run()).await.unwrap_err();
        match err {
            GraphError::RetryExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        let child: Arc<dyn NodeHandler<i64>> = Arc::new(FlakyNode {
            fail_times: 100,
            calls: AtomicU32::new(0),
        });
        let policy = RetryPolicy::new(5, Duration::from_millis(1), 2.0);
        let node = RetryNode::new("retry", child, policy).with_retry_predicate(|_| false);
        let err = node.call(1, NodeContext::new_run()).await.unwrap_err();
        assert!(matches!(err, GraphError::Workflow { .. }));
    }
}
