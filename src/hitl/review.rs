//! State-modifying review node (§4.5.5).

use super::store::ReviewStore;
use super::{cancelled_or_timeout, poll, resolve_run_id, RunIdAccessor};
use crate::context::NodeContext;
use crate::error::Result;
use crate::node::NodeHandler;
use std::sync::Arc;
use std::time::Duration;

/// Presents the current state plus a `context` string; the reviewer
/// returns a possibly-modified state. When `allow_modification == false`
/// the caller is contractually obliged to return the state unchanged —
/// this node does not re-validate that (§4.5.5, §9 Open Questions).
pub struct ReviewNode<S> {
    name: String,
    store: Arc<dyn ReviewStore<S>>,
    context: Option<String>,
    allow_modification: bool,
    timeout: Option<Duration>,
    run_id_of: Option<RunIdAccessor<S>>,
}

impl<S> ReviewNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, store: Arc<dyn ReviewStore<S>>) -> Self {
        Self {
            name: name.into(),
            store,
            context: None,
            allow_modification: true,
            timeout: None,
            run_id_of: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_allow_modification(mut self, allow: bool) -> Self {
        self.allow_modification = allow;
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
impl<S> NodeHandler<S> for ReviewNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn call(&self, state: S, ctx: NodeContext) -> Result<S> {
        let run_id = resolve_run_id(&ctx, &self.run_id_of, &state);
        self.store
            .request(&run_id, &self.name, state.clone(), self.context.clone(), self.allow_modification)
            .await;

        let store = &self.store;
        let name = &self.name;
        let outcome = poll(&ctx, self.timeout, || async { store.get(&run_id, name).await }).await;

        match outcome {
            Ok(reviewed) => {
                self.store.remove(&run_id, &self.name).await;
                Ok(reviewed)
            }
            Err(failure) => Err(cancelled_or_timeout(&self.name, failure, "review timed out")),
        }
    }
}
