//! # workflow-graph - cancellable, human-in-the-loop node graphs
//!
//! A small orchestration engine for running a directed graph of async
//! nodes over a user-defined state type, with first-class support for
//! parallel fan-out, retries, nested sub-workflows, and suspending a run
//! for human approval, decision, input, or review.
//!
//! ## Core Concepts
//!
//! ### 1. Graph and GraphBuilder
//!
//! [`Graph`] holds named nodes and the edges between them; [`GraphBuilder`]
//! is the fluent construction API. `build()` validates the graph (entry
//! point set, no dangling edges, at least one exit point reachable) before
//! handing back an immutable, executable [`Graph`].
//!
//! ### 2. Nodes
//!
//! Every node, plain or composite, satisfies the same [`NodeHandler`]
//! contract: `async fn(state, context) -> Result<state>`. Composite nodes
//! in [`composite`] (retry, parallel, loop, sub-workflow, dynamic branch,
//! validation) wrap child handlers and nest without limit.
//!
//! ### 3. Execution
//!
//! [`Executor`] walks the graph from its entry point, running each node,
//! then picking the first matching outgoing edge in declaration order.
//! Execution stops at an exit point or when no edge matches.
//!
//! ### 4. Human-in-the-loop
//!
//! [`hitl`] provides four node types — approval, decision, input, review —
//! that suspend a run by writing a pending record to a store and polling
//! it until an external actor resolves it or a timeout/cancellation fires.
//!
//! ### 5. Inspection
//!
//! [`inspector::StateInspector`] snapshots, diffs, and rolls back any
//! state type that implements [`inspector::Inspectable`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use workflow_graph::{GraphBuilder, NodeContext, Executor};
//!
//! #[derive(Clone)]
//! struct Counter { n: i64 }
//!
//! # async fn run() -> workflow_graph::Result<()> {
//! let graph = GraphBuilder::<Counter>::new()
//!     .add_node("increment", |state: Counter, _ctx: NodeContext| {
//!         Box::pin(async move { Ok(Counter { n: state.n + 1 }) })
//!     })?
//!     .set_entry_point("increment")?
//!     .add_exit_point("increment")?
//!     .build()?;
//!
//! let result = Executor::new(&graph).execute(Counter { n: 0 }).await?;
//! assert_eq!(result.n, 1);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod composite;
pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod hitl;
pub mod inspector;
pub mod node;

pub use builder::GraphBuilder;
pub use context::NodeContext;
pub use error::{GraphError, Result};
pub use executor::Executor;
pub use graph::{Edge, Graph, NodeId};
pub use node::{Node, NodeHandler};
