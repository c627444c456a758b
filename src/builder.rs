//! Fluent construction of a [`Graph`], mirroring the teacher's
//! `StateGraph` builder API (§4.1, §2 "Builder").

use crate::error::Result;
use crate::graph::{Edge, Graph};
use crate::node::{Node, NodeHandler};

/// Builds a [`Graph`] and validates it before handing out an executable
/// graph. Graph and node objects are immutable after [`GraphBuilder::build`]
/// (§3 "Lifecycle").
pub struct GraphBuilder<S> {
    graph: Graph<S>,
}

impl<S> Default for GraphBuilder<S>
where
    S: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> GraphBuilder<S>
where
    S: Send + 'static,
{
    pub fn new() -> Self {
        Self { graph: Graph::new() }
    }

    pub fn add_node(mut self, name: impl Into<String>, handler: impl NodeHandler<S> + 'static) -> Result<Self> {
        self.graph.add_node(Node::new(name, handler))?;
        Ok(self)
    }

    pub fn add_node_with_description(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl NodeHandler<S> + 'static,
    ) -> Result<Self> {
        self.graph
            .add_node(Node::new(name, handler).with_description(description))?;
        Ok(self)
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Result<Self> {
        self.graph.add_edge(Edge::unconditional(from, to))?;
        Ok(self)
    }

    pub fn add_guarded_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        guard: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> Result<Self> {
        self.graph.add_edge(Edge::guarded(from, to, guard))?;
        Ok(self)
    }

    pub fn set_entry_point(mut self, name: impl Into<String>) -> Result<Self> {
        self.graph.set_entry_point(name)?;
        Ok(self)
    }

    pub fn add_exit_point(mut self, name: impl Into<String>) -> Result<Self> {
        self.graph.add_exit_point(name)?;
        Ok(self)
    }

    /// Validate structural invariants (§3) and return the finished graph.
    /// Mirrors the teacher's `compile()`: validation happens once here,
    /// subsequent executions assume validity (§4.1).
    pub fn build(self) -> Result<Graph<S>> {
        let violations = self.graph.validate();
        if violations.is_empty() {
            Ok(self.graph)
        } else {
            Err(crate::error::GraphError::Configuration(violations.join("; ")))
        }
    }
}
