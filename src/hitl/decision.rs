//! Multi-option decision node (§4.5.3).

use super::store::DecisionStore;
use super::{cancelled_or_timeout, poll, resolve_run_id, RunIdAccessor};
use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use std::sync::Arc;
use std::time::Duration;

/// Presents `question` with an ordered, non-empty list of `options`.
/// The resolved option is validated against `options` again at read time
/// (§9 Open Questions) and written into state via `set_decision` if one
/// is configured.
pub struct DecisionNode<S> {
    name: String,
    store: Arc<dyn DecisionStore<S>>,
    question: String,
    options: Vec<String>,
    timeout: Option<Duration>,
    run_id_of: Option<RunIdAccessor<S>>,
    set_decision: Option<Arc<dyn Fn(&mut S, &str) -> bool + Send + Sync>>,
}

impl<S> DecisionNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn DecisionStore<S>>,
        question: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        if options.is_empty() {
            return Err(GraphError::Configuration(format!(
                "DecisionNode '{name}' requires a non-empty options list"
            )));
        }
        Ok(Self {
            name,
            store,
            question: question.into(),
            options,
            timeout: None,
            run_id_of: None,
            set_decision: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_run_id_accessor(mut self, accessor: impl Fn(&S) -> Option<String> + Send + Sync + 'static) -> Self {
        self.run_id_of = Some(Arc::new(accessor));
        self
    }

    /// Accessor writing the chosen option into state (e.g. a `Decision` or
    /// `SelectedOption` property, per §4.5.3).
    pub fn with_decision_setter(mut self, setter: impl Fn(&mut S, &str) -> bool + Send + Sync + 'static) -> Self {
        self.set_decision = Some(Arc::new(setter));
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for DecisionNode<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn call(&self, mut state: S, ctx: NodeContext) -> Result<S> {
        let run_id = resolve_run_id(&ctx, &self.run_id_of, &state);
        self.store
            .request(&run_id, &self.name, state.clone(), self.question.clone(), self.options.clone())
            .await;

        let store = &self.store;
        let name = &self.name;
        let outcome = poll(&ctx, self.timeout, || async { store.get(&run_id, name).await }).await;

        let decision = match outcome {
            Ok(d) => d,
            Err(failure) => return Err(cancelled_or_timeout(&self.name, failure, "decision timed out")),
        };

        self.store.remove(&run_id, &self.name).await;

        if !self.options.contains(&decision) {
            return Err(GraphError::workflow(
                &self.name,
                format!("resolved decision '{decision}' is not one of the offered options"),
            ));
        }

        if let Some(setter) = &self.set_decision {
            if !setter(&mut state, &decision) {
                tracing::debug!(node = %self.name, decision = %decision, "decision property was un-writable, skipping write");
            }
        }

        Ok(state)
    }
}
