//! Composite / control-flow nodes (§4.4): higher-order nodes that wrap one
//! or more child nodes and satisfy the same `(state, context) -> state`
//! contract as any plain node, so composition nests without limit.

pub mod dynamic_branch;
pub mod loop_node;
pub mod parallel;
pub mod retry;
pub mod sub_workflow;
pub mod validation;

pub use dynamic_branch::DynamicBranchNode;
pub use loop_node::LoopNode;
pub use parallel::{ParallelMode, ParallelNode};
pub use retry::{RetryNode, RetryPolicy};
pub use sub_workflow::SubWorkflowNode;
pub use validation::{ValidationNode, ValidationResult};
