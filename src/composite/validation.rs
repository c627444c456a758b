//! Validation gating node (§4.4.6).

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Outcome of a [`ValidationNode`]'s validator.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self { ok: true, errors: Vec::new() }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self { ok: false, errors }
    }
}

/// Runs a validator and writes the result into state. If `ok == false`
/// and `throw_on_failure` (the default), the node fails with
/// [`GraphError::Workflow`]; otherwise the state is returned unchanged
/// and the caller branches on the written property.
pub struct ValidationNode<S> {
    name: String,
    validator: Arc<dyn Fn(&S, NodeContext) -> BoxFuture<'static, Result<ValidationResult>> + Send + Sync>,
    set_result: Option<Arc<dyn Fn(&mut S, &ValidationResult) -> bool + Send + Sync>>,
    throw_on_failure: bool,
}

impl<S> ValidationNode<S>
where
    S: Send + 'static,
{
    pub fn new(
        name: impl Into<String>,
        validator: impl Fn(&S, NodeContext) -> BoxFuture<'static, Result<ValidationResult>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            validator: Arc::new(validator),
            set_result: None,
            throw_on_failure: true,
        }
    }

    pub fn with_result_setter(mut self, setter: impl Fn(&mut S, &ValidationResult) -> bool + Send + Sync + 'static) -> Self {
        self.set_result = Some(Arc::new(setter));
        self
    }

    pub fn with_throw_on_failure(mut self, throw: bool) -> Self {
        self.throw_on_failure = throw;
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for ValidationNode<S>
where
    S: Send + 'static,
{
    async fn call(&self, mut state: S, ctx: NodeContext) -> Result<S> {
        let result = (self.validator)(&state, ctx).await?;

        if let Some(setter) = &self.set_result {
            setter(&mut state, &result);
        }

        if !result.ok && self.throw_on_failure {
            return Err(GraphError::workflow(
                &self.name,
                format!("validation failed: {}", result.errors.join(", ")),
            ));
        }

        Ok(state)
    }
}
