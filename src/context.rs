//! Per-run execution context threaded through every node invocation.
//!
//! The design's base contract is `(state, cancel) -> state`. This port
//! bundles the cancellation token together with a run identifier into a
//! single [`NodeContext`] so HITL nodes can correlate pending requests
//! without requiring every state type to carry a `RunId` field (see
//! Design Notes in SPEC_FULL.md §3). Callers who *do* want the run id
//! sourced from state can still supply a `run_id_of` accessor closure to
//! HITL node constructors; when present it overrides the generated id.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Carries cooperative cancellation and run correlation for one execution
/// of a graph (including nested sub-workflows and parallel children, which
/// share the same token).
#[derive(Clone)]
pub struct NodeContext {
    cancel: CancellationToken,
    run_id: String,
}

impl NodeContext {
    /// Start a fresh run with a newly generated identifier.
    pub fn new_run() -> Self {
        Self {
            cancel: CancellationToken::new(),
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Start a fresh run with an explicit identifier (e.g. extracted from
    /// the caller's initial state).
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            cancel: CancellationToken::new(),
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Derive a child context for a parallel/sub-workflow child: same run
    /// id and a cancellation token linked to this one, so cancelling the
    /// parent cancels every child, but a child's own cancellation (e.g. a
    /// HITL timeout) does not propagate back up.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            run_id: self.run_id.clone(),
        }
    }
}
