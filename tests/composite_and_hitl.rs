//! Coverage for the composite nodes and HITL node types not already
//! exercised end-to-end in `graph_execution.rs`.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use workflow_graph::composite::{
    DynamicBranchNode, LoopNode, SubWorkflowNode, ValidationNode, ValidationResult,
};
use workflow_graph::hitl::store::{InMemoryInputStore, InMemoryReviewStore, InputStore, InputType, ReviewStore};
use workflow_graph::hitl::{InputNode, ReviewNode};
use workflow_graph::inspector::{Inspectable, StateInspector, StateSnapshot};
use workflow_graph::{Executor, GraphBuilder, GraphError, NodeContext, NodeHandler};

#[derive(Clone, Debug)]
struct Order {
    total: i64,
    status: String,
    discount_code: Option<String>,
}

impl Inspectable for Order {
    fn type_name(&self) -> &'static str {
        "Order"
    }

    fn properties(&self) -> Vec<(String, serde_json::Value)> {
        vec![
            ("total".to_string(), serde_json::json!(self.total)),
            ("status".to_string(), serde_json::json!(self.status)),
        ]
    }

    fn set_property(&mut self, name: &str, value: serde_json::Value) -> bool {
        match (name, value) {
            ("total", serde_json::Value::Number(n)) => {
                self.total = n.as_i64().unwrap_or(self.total);
                true
            }
            ("status", serde_json::Value::String(s)) => {
                self.status = s;
                true
            }
            _ => false,
        }
    }
}

#[tokio::test]
async fn test_loop_node_drives_a_counter_to_threshold() {
    let child: Arc<dyn NodeHandler<Order>> = Arc::new(
        |state: Order, _ctx: NodeContext| -> BoxFuture<'static, workflow_graph::Result<Order>> {
            Box::pin(async move { Ok(Order { total: state.total + 10, ..state }) })
        },
    );
    let node = LoopNode::new("accumulate", child, |s: &Order| s.total < 50);

    let graph = GraphBuilder::<Order>::new()
        .add_node("accumulate", node)
        .unwrap()
        .set_entry_point("accumulate")
        .unwrap()
        .add_exit_point("accumulate")
        .unwrap()
        .build()
        .unwrap();

    let result = Executor::new(&graph)
        .execute(Order { total: 0, status: "new".to_string(), discount_code: None })
        .await
        .unwrap();
    assert_eq!(result.total, 50);
}

#[tokio::test]
async fn test_validation_node_fails_the_run_by_default() {
    let node = ValidationNode::new(
        "validate",
        |state: &Order, _ctx: NodeContext| -> BoxFuture<'static, workflow_graph::Result<ValidationResult>> {
            let ok = state.total > 0;
            Box::pin(async move {
                Ok(if ok {
                    ValidationResult::success()
                } else {
                    ValidationResult::failure(vec!["total must be positive".to_string()])
                })
            })
        },
    );

    let graph = GraphBuilder::<Order>::new()
        .add_node("validate", node)
        .unwrap()
        .set_entry_point("validate")
        .unwrap()
        .add_exit_point("validate")
        .unwrap()
        .build()
        .unwrap();

    let err = Executor::new(&graph)
        .execute(Order { total: 0, status: "new".to_string(), discount_code: None })
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Workflow { .. }));
}

#[tokio::test]
async fn test_validation_node_can_be_configured_to_not_throw() {
    let node = ValidationNode::new(
        "validate",
        |state: &Order, _ctx: NodeContext| -> BoxFuture<'static, workflow_graph::Result<ValidationResult>> {
            let ok = state.total > 0;
            Box::pin(async move {
                Ok(if ok {
                    ValidationResult::success()
                } else {
                    ValidationResult::failure(vec!["total must be positive".to_string()])
                })
            })
        },
    )
    .with_throw_on_failure(false)
    .with_result_setter(|state: &mut Order, result: &ValidationResult| {
        state.status = if result.ok { "valid".to_string() } else { "invalid".to_string() };
        true
    });

    let graph = GraphBuilder::<Order>::new()
        .add_node("validate", node)
        .unwrap()
        .set_entry_point("validate")
        .unwrap()
        .add_exit_point("validate")
        .unwrap()
        .build()
        .unwrap();

    let result = Executor::new(&graph)
        .execute(Order { total: 0, status: "new".to_string(), discount_code: None })
        .await
        .unwrap();
    assert_eq!(result.status, "invalid");
}

#[tokio::test]
async fn test_dynamic_branch_writes_chosen_route_for_a_guard_to_read() {
    let node = DynamicBranchNode::new(
        "choose",
        |state: &Order, _ctx: NodeContext| -> BoxFuture<'static, workflow_graph::Result<String>> {
            let target = if state.total > 100 { "big" } else { "small" }.to_string();
            Box::pin(async move { Ok(target) })
        },
    )
    .with_next_node_setter(|state: &mut Order, target: &str| {
        state.status = target.to_string();
        true
    });

    let graph = GraphBuilder::<Order>::new()
        .add_node("choose", node)
        .unwrap()
        .add_node("big", |state: Order, _ctx: NodeContext| -> BoxFuture<'static, workflow_graph::Result<Order>> {
            Box::pin(async move { Ok(state) })
        })
        .unwrap()
        .add_node("small", |state: Order, _ctx: NodeContext| -> BoxFuture<'static, workflow_graph::Result<Order>> {
            Box::pin(async move { Ok(state) })
        })
        .unwrap()
        .add_guarded_edge("choose", "big", |s: &Order| s.status == "big")
        .unwrap()
        .add_guarded_edge("choose", "small", |s: &Order| s.status == "small")
        .unwrap()
        .set_entry_point("choose")
        .unwrap()
        .add_exit_point("big")
        .unwrap()
        .add_exit_point("small")
        .unwrap()
        .build()
        .unwrap();

    let executor = Executor::new(&graph);
    let result = executor
        .execute(Order { total: 500, status: "new".to_string(), discount_code: None })
        .await
        .unwrap();
    assert_eq!(result.status, "big");

    let result = executor
        .execute(Order { total: 5, status: "new".to_string(), discount_code: None })
        .await
        .unwrap();
    assert_eq!(result.status, "small");
}

#[derive(Clone)]
struct LineItemCount {
    count: i64,
}

#[tokio::test]
async fn test_sub_workflow_maps_state_into_and_out_of_a_nested_graph() {
    let inner = GraphBuilder::<LineItemCount>::new()
        .add_node("bump", |state: LineItemCount, _ctx: NodeContext| -> BoxFuture<'static, workflow_graph::Result<LineItemCount>> {
            Box::pin(async move { Ok(LineItemCount { count: state.count + 1 }) })
        })
        .unwrap()
        .set_entry_point("bump")
        .unwrap()
        .add_exit_point("bump")
        .unwrap()
        .build()
        .unwrap();

    let sub_node = SubWorkflowNode::new(
        "bump_total",
        Arc::new(inner),
        |order: &Order| Some(LineItemCount { count: order.total }),
        |inner_result: LineItemCount, order: &Order| Some(Order { total: inner_result.count, ..order.clone() }),
    );

    let graph = GraphBuilder::<Order>::new()
        .add_node("bump_total", sub_node)
        .unwrap()
        .set_entry_point("bump_total")
        .unwrap()
        .add_exit_point("bump_total")
        .unwrap()
        .build()
        .unwrap();

    let result = Executor::new(&graph)
        .execute(Order { total: 10, status: "new".to_string(), discount_code: None })
        .await
        .unwrap();
    assert_eq!(result.total, 11);
}

#[tokio::test]
async fn test_input_node_coerces_and_writes_a_typed_value() {
    let store: Arc<InMemoryInputStore<Order>> = Arc::new(InMemoryInputStore::new());
    let node = InputNode::new(
        "ask_discount",
        store.clone(),
        "discount_code",
        InputType::Text,
        "enter a discount code",
        |state: &mut Order, value: serde_json::Value| {
            state.discount_code = value.as_str().map(|s| s.to_string());
            Ok(())
        },
    );

    let graph = GraphBuilder::<Order>::new()
        .add_node("ask_discount", node)
        .unwrap()
        .set_entry_point("ask_discount")
        .unwrap()
        .add_exit_point("ask_discount")
        .unwrap()
        .build()
        .unwrap();

    let ctx = NodeContext::new_run();
    let run_id = ctx.run_id().to_string();
    let store_for_answer = store.clone();
    let answerer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        store_for_answer
            .set_input(&run_id, "ask_discount", "discount_code", serde_json::json!("SAVE10"))
            .await;
    });

    let result = Executor::new(&graph)
        .execute_with_context(Order { total: 10, status: "new".to_string(), discount_code: None }, ctx)
        .await
        .unwrap();
    answerer.await.unwrap();
    assert_eq!(result.discount_code.as_deref(), Some("SAVE10"));
}

#[tokio::test]
async fn test_review_node_returns_the_reviewed_state() {
    let store: Arc<InMemoryReviewStore<Order>> = Arc::new(InMemoryReviewStore::new());
    let node = ReviewNode::new("review_order", store.clone());

    let graph = GraphBuilder::<Order>::new()
        .add_node("review_order", node)
        .unwrap()
        .set_entry_point("review_order")
        .unwrap()
        .add_exit_point("review_order")
        .unwrap()
        .build()
        .unwrap();

    let ctx = NodeContext::new_run();
    let run_id = ctx.run_id().to_string();
    let store_for_reviewer = store.clone();
    let reviewer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        store_for_reviewer
            .set_reviewed_state(&run_id, "review_order", Order { total: 999, status: "reviewed".to_string(), discount_code: None })
            .await;
    });

    let result = Executor::new(&graph)
        .execute_with_context(Order { total: 10, status: "new".to_string(), discount_code: None }, ctx)
        .await
        .unwrap();
    reviewer.await.unwrap();
    assert_eq!(result.total, 999);
    assert_eq!(result.status, "reviewed");
}

#[test]
fn test_inspector_diff_and_rollback_round_trip() {
    let mut order = Order { total: 10, status: "new".to_string(), discount_code: None };
    let mut inspector = StateInspector::new();
    let before = StateSnapshot::capture(&order);

    inspector.capture(&order, Some("before checkout".to_string()));
    order.total = 200;
    order.status = "checked_out".to_string();
    let after = StateSnapshot::capture(&order);

    let diff = StateInspector::diff(&before, &after);
    assert_eq!(diff.len(), 2);

    assert!(inspector.rollback(&mut order, Some(0)));
    assert_eq!(order.total, 10);
    assert_eq!(order.status, "new");
}
