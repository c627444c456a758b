//! Graph data structures and structural validation (§3, §4.1 of the design).

use crate::error::{GraphError, Result};
use crate::node::Node;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

pub type NodeId = String;

/// A transition between two nodes, optionally guarded by a predicate on
/// the state. A missing guard means "unconditional" (§3).
pub struct Edge<S> {
    pub from: NodeId,
    pub to: NodeId,
    pub guard: Option<Arc<dyn Fn(&S) -> bool + Send + Sync>>,
}

impl<S> std::fmt::Debug for Edge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("guard", &self.guard.as_ref().map(|_| "<guard>"))
            .finish()
    }
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<S> Edge<S> {
    pub fn unconditional(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            guard: None,
        }
    }

    pub fn guarded(
        from: impl Into<String>,
        to: impl Into<String>,
        guard: impl Fn(&S) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            guard: Some(Arc::new(guard)),
        }
    }

    /// Evaluate the guard. A missing guard is unconditionally true. A
    /// guard that panics is not caught here — see
    /// [`Graph::evaluate_guard`], which is the call site that implements
    /// the "exception treated as false, logged as warning" rule (§4.2).
    fn matches(&self, state: &S) -> bool {
        match &self.guard {
            None => true,
            Some(g) => g(state),
        }
    }
}

/// A directed graph of named nodes with guarded edges (§3).
pub struct Graph<S> {
    nodes: HashMap<NodeId, Node<S>>,
    node_order: Vec<NodeId>,
    edges: Vec<Edge<S>>,
    entry_point: Option<NodeId>,
    exit_points: HashSet<NodeId>,
}

impl<S> Default for Graph<S>
where
    S: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Graph<S>
where
    S: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            node_order: Vec::new(),
            edges: Vec::new(),
            entry_point: None,
            exit_points: HashSet::new(),
        }
    }

    /// Add a node. Fails with [`GraphError::DuplicateNode`] if the name is
    /// already taken (invariant 6).
    pub fn add_node(&mut self, node: Node<S>) -> Result<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(GraphError::DuplicateNode(node.name.clone()));
        }
        self.node_order.push(node.name.clone());
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Add an edge. Fails with [`GraphError::UnknownNode`] if either
    /// endpoint is absent (invariant 3). Edges are appended in insertion
    /// order, which governs guard-evaluation priority (§4.2 step 5).
    pub fn add_edge(&mut self, edge: Edge<S>) -> Result<()> {
        self.require_node(&edge.from)?;
        self.require_node(&edge.to)?;
        self.edges.push(edge);
        Ok(())
    }

    pub fn set_entry_point(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.require_node(&name)?;
        self.entry_point = Some(name);
        Ok(())
    }

    pub fn add_exit_point(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.require_node(&name)?;
        self.exit_points.insert(name);
        Ok(())
    }

    fn require_node(&self, name: &str) -> Result<()> {
        if self.nodes.contains_key(name) {
            Ok(())
        } else {
            Err(GraphError::UnknownNode(name.to_string()))
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node<S>> {
        self.nodes.get(name)
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.entry_point.as_deref()
    }

    pub fn is_exit_point(&self, name: &str) -> bool {
        self.exit_points.contains(name)
    }

    pub fn exit_points(&self) -> &HashSet<NodeId> {
        &self.exit_points
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.node_order.iter().map(String::as_str)
    }

    /// Outgoing edges of `from`, in insertion order.
    pub fn outgoing_edges<'a, 'b>(&'a self, from: &'b str) -> impl Iterator<Item = &'a Edge<S>> + use<'a, 'b, S> {
        self.edges.iter().filter(move |e| e.from == from)
    }

    /// Structural validation (§3 invariants 1–6). Returns every violation
    /// found, not just the first ("validation is total", §8).
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();

        match &self.entry_point {
            None => violations.push("no entry point set".to_string()),
            Some(entry) if !self.nodes.contains_key(entry) => {
                violations.push(format!("entry point '{entry}' is not a node in the graph"))
            }
            _ => {}
        }

        if self.exit_points.is_empty() {
            violations.push("no exit point set".to_string());
        }
        for exit in &self.exit_points {
            if !self.nodes.contains_key(exit) {
                violations.push(format!("exit point '{exit}' is not a node in the graph"));
            }
        }

        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from) {
                violations.push(format!("edge references unknown source node '{}'", edge.from));
            }
            if !self.nodes.contains_key(&edge.to) {
                violations.push(format!("edge references unknown target node '{}'", edge.to));
            }
        }

        if let Some(entry) = &self.entry_point {
            if self.nodes.contains_key(entry) {
                let reachable = self.reachable_from(entry);
                for name in &self.node_order {
                    if !reachable.contains(name) {
                        violations.push(format!("node '{name}' is not reachable from the entry point"));
                    }
                }
            }
        }

        for name in &self.node_order {
            if !self.exit_points.contains(name) && self.outgoing_edges(name).next().is_none() {
                violations.push(format!("non-exit node '{name}' has no outgoing edge"));
            }
        }

        violations
    }

    /// BFS over edges, ignoring guards, per invariant 4.
    fn reachable_from(&self, start: &str) -> HashSet<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(start.to_string());
        queue.push_back(start.to_string());
        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing_edges(&current) {
                if seen.insert(edge.to.clone()) {
                    queue.push_back(edge.to.clone());
                }
            }
        }
        seen
    }

    /// Scan outgoing edges of `current` in insertion order and return the
    /// first whose guard matches. A guard that panics is caught here and
    /// treated as false, logged as a warning (§4.2) — unless it was the
    /// only outgoing edge, in which case [`GraphError::Workflow`] with
    /// message `guard evaluation failed` is returned.
    pub fn next_edge(&self, current: &str, state: &S) -> Result<Option<&Edge<S>>> {
        let candidates: Vec<&Edge<S>> = self.outgoing_edges(current).collect();
        let only_candidate = candidates.len() == 1;
        for edge in &candidates {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| edge.matches(state)));
            match outcome {
                Ok(true) => return Ok(Some(edge)),
                Ok(false) => continue,
                Err(_) if only_candidate => {
                    return Err(GraphError::workflow(current, "guard evaluation failed"))
                }
                Err(_) => {
                    tracing::warn!(node = %current, to = %edge.to, "guard evaluation panicked, treating as false");
                    continue;
                }
            }
        }
        Ok(None)
    }
}
