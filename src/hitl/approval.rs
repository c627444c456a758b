//! Approval gate nodes (§4.5.1, §4.5.2).

use super::store::{ApprovalStatus, ApprovalStore};
use super::{cancelled_or_timeout, poll, resolve_run_id, RunIdAccessor};
use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Resolution surfaced by [`ConditionalApprovalNode`] (§4.5.2). Unlike
/// [`ApprovalStatus`], which is the store's internal record state, this
/// also captures the `Modified` case where an external reviewer both
/// edited state and resolved the gate in one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalOutcome {
    Pending,
    Approved,
    Rejected,
    Modified,
}

/// Strict approval gate: blocks until approved or rejected. Rejection or
/// timeout both fail with [`GraphError::Workflow`]; approval returns the
/// state unchanged (§4.5.1).
pub struct ApprovalNode<S> {
    name: String,
    store: Arc<dyn ApprovalStore<S>>,
    message: Option<String>,
    timeout: Option<Duration>,
    run_id_of: Option<RunIdAccessor<S>>,
}

impl<S> ApprovalNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, store: Arc<dyn ApprovalStore<S>>) -> Self {
        Self {
            name: name.into(),
            store,
            message: None,
            timeout: None,
            run_id_of: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_run_id_accessor(mut self, accessor: impl Fn(&S) -> Option<String> + Send + Sync + 'static) -> Self {
        self.run_id_of = Some(Arc::new(accessor));
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for ApprovalNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S> {
        let run_id = resolve_run_id(&ctx, &self.run_id_of, &state);
        self.store.request(&run_id, &self.name, state.clone(), self.message.clone()).await;

        let store = &self.store;
        let name = &self.name;
        let outcome = poll(&ctx, self.timeout, || async {
            match store.status(&run_id, name).await {
                Some(ApprovalStatus::Approved) => Some(true),
                Some(ApprovalStatus::Rejected) => Some(false),
                _ => None,
            }
        })
        .await;

        match outcome {
            Ok(true) => {
                self.store.remove(&run_id, &self.name).await;
                Ok(state)
            }
            Ok(false) => {
                self.store.remove(&run_id, &self.name).await;
                Err(GraphError::workflow(&self.name, "approval rejected"))
            }
            Err(failure) => Err(cancelled_or_timeout(&self.name, failure, "approval timed out")),
        }
    }
}

/// Lenient approval gate: always returns the state, writing the outcome
/// into a caller-named property so downstream edges can branch on it
/// (§4.5.2). A timeout is written as `Rejected` rather than failing the
/// run.
pub struct ConditionalApprovalNode<S> {
    name: String,
    store: Arc<dyn ApprovalStore<S>>,
    message: Option<String>,
    timeout: Option<Duration>,
    run_id_of: Option<RunIdAccessor<S>>,
    set_outcome: Option<Arc<dyn Fn(&mut S, ApprovalOutcome) -> bool + Send + Sync>>,
}

impl<S> ConditionalApprovalNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, store: Arc<dyn ApprovalStore<S>>) -> Self {
        Self {
            name: name.into(),
            store,
            message: None,
            timeout: None,
            run_id_of: None,
            set_outcome: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_run_id_accessor(mut self, accessor: impl Fn(&S) -> Option<String> + Send + Sync + 'static) -> Self {
        self.run_id_of = Some(Arc::new(accessor));
        self
    }

    /// Accessor writing the resolved [`ApprovalOutcome`] into the caller's
    /// state, defaulting to a property named `ApprovalOutcome` in spirit.
    pub fn with_outcome_setter(mut self, setter: impl Fn(&mut S, ApprovalOutcome) -> bool + Send + Sync + 'static) -> Self {
        self.set_outcome = Some(Arc::new(setter));
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for ConditionalApprovalNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn call(&self, mut state: S, ctx: NodeContext) -> Result<S> {
        let run_id = resolve_run_id(&ctx, &self.run_id_of, &state);
        self.store.request(&run_id, &self.name, state.clone(), self.message.clone()).await;

        let store = &self.store;
        let name = &self.name;
        let outcome = poll(&ctx, self.timeout, || async {
            if let Some(modified) = store.take_modified(&run_id, name).await {
                return Some((ApprovalOutcome::Modified, Some(modified)));
            }
            match store.status(&run_id, name).await {
                Some(ApprovalStatus::Approved) => Some((ApprovalOutcome::Approved, None)),
                Some(ApprovalStatus::Rejected) => Some((ApprovalOutcome::Rejected, None)),
                _ => None,
            }
        })
        .await;

        let (resolved, modified_state) = match outcome {
            Ok(pair) => pair,
            Err(super::PollFailure::Cancelled) => return Err(GraphError::cancelled(&self.name)),
            Err(super::PollFailure::TimedOut) => (ApprovalOutcome::Rejected, None),
        };

        self.store.remove(&run_id, &self.name).await;

        if let Some(modified) = modified_state {
            state = modified;
        }

        if let Some(setter) = &self.set_outcome {
            if !setter(&mut state, resolved) {
                tracing::debug!(node = %self.name, "approval outcome property was un-writable, skipping write");
            }
        }

        Ok(state)
    }
}
