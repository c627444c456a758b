//! Human-in-the-loop nodes (§4.5): approval, decision, input and review.
//!
//! All four share the suspend-poll-resume protocol described in the
//! design: create a pending record on first execution, poll the
//! associated store every ~500ms (unbounded wait) or ~100ms (bounded
//! timeout), and apply the out-of-band resolution when it appears.

pub mod approval;
pub mod decision;
pub mod input;
pub mod review;
pub mod store;

pub use approval::{ApprovalNode, ApprovalOutcome, ConditionalApprovalNode};
pub use decision::DecisionNode;
pub use input::{InputNode, InputType};
pub use review::ReviewNode;

use crate::context::NodeContext;
use crate::error::GraphError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Closure supplied at node construction to read a run identifier off
/// state, overriding the generated one in [`NodeContext`] (§3 "runId is
/// extracted from a property ... or generated if absent").
pub type RunIdAccessor<S> = Arc<dyn Fn(&S) -> Option<String> + Send + Sync>;

pub(crate) fn resolve_run_id<S>(ctx: &NodeContext, accessor: &Option<RunIdAccessor<S>>, state: &S) -> String {
    accessor
        .as_ref()
        .and_then(|f| f(state))
        .unwrap_or_else(|| ctx.run_id().to_string())
}

/// Why a poll loop gave up without a resolved value.
pub(crate) enum PollFailure {
    Cancelled,
    TimedOut,
}

/// Poll `check` until it returns `Some`, cancellation fires, or (if
/// `timeout` is set) the deadline passes. Interval is 500ms unbounded,
/// 100ms when a timeout is in effect (§4.5 step 2).
pub(crate) async fn poll<F, Fut, T>(
    ctx: &NodeContext,
    timeout: Option<Duration>,
    mut check: F,
) -> std::result::Result<T, PollFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let interval = if timeout.is_some() {
        Duration::from_millis(100)
    } else {
        Duration::from_millis(500)
    };
    let deadline = timeout.map(|d| tokio::time::Instant::now() + d);

    loop {
        if let Some(value) = check().await {
            return Ok(value);
        }
        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                return Err(PollFailure::TimedOut);
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = ctx.cancel_token().cancelled() => return Err(PollFailure::Cancelled),
        }
    }
}

pub(crate) fn cancelled_or_timeout(node: &str, failure: PollFailure, timeout_message: &str) -> GraphError {
    match failure {
        PollFailure::Cancelled => GraphError::cancelled(node),
        PollFailure::TimedOut => GraphError::workflow(node, timeout_message),
    }
}
