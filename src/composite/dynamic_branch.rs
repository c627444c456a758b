//! Runtime selector that writes a routing decision into state (§4.4.5).

use crate::context::NodeContext;
use crate::error::{GraphError, Result};
use crate::node::NodeHandler;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Runs a selector and writes the chosen target node name into state via
/// `set_next_node`. The node itself does not transfer control — pair it
/// with guarded edges whose guards read the same field the setter wrote.
/// If the setter is absent or the write fails it is silently skipped: per
/// §4.4.5 "if the target property is absent or un-writable the write is
/// silently skipped (guards simply will not match)".
pub struct DynamicBranchNode<S> {
    name: String,
    selector: Arc<dyn Fn(&S, NodeContext) -> BoxFuture<'static, Result<String>> + Send + Sync>,
    set_next_node: Option<Arc<dyn Fn(&mut S, &str) -> bool + Send + Sync>>,
}

impl<S> DynamicBranchNode<S>
where
    S: Send + 'static,
{
    pub fn new(
        name: impl Into<String>,
        selector: impl Fn(&S, NodeContext) -> BoxFuture<'static, Result<String>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            selector: Arc::new(selector),
            set_next_node: None,
        }
    }

    /// Supply the accessor that writes the chosen node name into state.
    /// Returns `true` if the write succeeded; `false` marks it as
    /// un-writable for this call.
    pub fn with_next_node_setter(mut self, setter: impl Fn(&mut S, &str) -> bool + Send + Sync + 'static) -> Self {
        self.set_next_node = Some(Arc::new(setter));
        self
    }
}

#[async_trait::async_trait]
impl<S> NodeHandler<S> for DynamicBranchNode<S>
where
    S: Send + 'static,
{
    async fn call(&self, mut state: S, ctx: NodeContext) -> Result<S> {
        let selected = (self.selector)(&state, ctx.clone()).await?;
        if selected.trim().is_empty() {
            return Err(GraphError::workflow(&self.name, "selector returned an empty selection"));
        }

        match &self.set_next_node {
            Some(setter) => {
                if !setter(&mut state, &selected) {
                    tracing::debug!(node = %self.name, selected = %selected, "next-node property was un-writable, skipping write");
                }
            }
            None => {
                tracing::debug!(node = %self.name, selected = %selected, "no next-node setter configured, skipping write");
            }
        }

        Ok(state)
    }
}
