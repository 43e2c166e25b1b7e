// tests/dependency_order.rs

mod common;
use crate::common::builders::{OperatorBuilder, op};
use crate::common::{ids, position};

use pipewatch::dag::{DagGraph, build_template_tasks, order_operator_ids, order_operators};
use pipewatch::errors::PipewatchError;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn diamond_orders_join_last() {
    let ops = vec![
        op("join", &["left", "right"]),
        op("left", &["root"]),
        op("right", &["root"]),
        op("root", &[]),
    ];

    let order = order_operator_ids(&ops).unwrap();
    assert_eq!(order, vec!["root", "left", "right", "join"]);
}

#[test]
fn leading_root_comes_first() {
    let ops = vec![op("a", &[]), op("b", &["a"]), op("c", &["b"]), op("d", &["a"])];
    let order = order_operator_ids(&ops).unwrap();
    assert_eq!(order[0], "a");
    assert!(position(&order, "b") < position(&order, "c"));
    assert!(position(&order, "a") < position(&order, "d"));
}

#[test]
fn ordering_keeps_operator_payload() {
    let ops = vec![
        OperatorBuilder::new("train")
            .task("t-train")
            .after("prep")
            .param("epochs", json!(5))
            .build(),
        OperatorBuilder::new("prep").task("t-prep").build(),
    ];

    let ordered = order_operators(&ops).unwrap();
    assert_eq!(ids(&ordered), vec!["prep", "train"]);
    assert_eq!(ordered[1].task_id, "t-train");
    assert_eq!(ordered[1].parameters["epochs"], json!(5));
}

#[test]
fn two_node_cycle_is_rejected_instead_of_hanging() {
    let ops = vec![op("a", &["b"]), op("b", &["a"]), op("free", &[])];
    match order_operators(&ops) {
        Err(PipewatchError::CyclicDependency(stuck)) => {
            assert_eq!(stuck, vec!["a".to_string(), "b".to_string()]);
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_cycle() {
    let ops = vec![op("loop", &["loop"])];
    assert!(matches!(
        order_operators(&ops),
        Err(PipewatchError::CyclicDependency(_))
    ));
}

#[test]
fn duplicate_ids_are_rejected() {
    let ops = vec![op("a", &[]), op("a", &[])];
    assert!(matches!(
        order_operators(&ops),
        Err(PipewatchError::DuplicateOperator(id)) if id == "a"
    ));
}

#[test]
fn repeated_dependency_counts_once() {
    let ops = vec![op("b", &["a", "a"]), op("a", &[])];
    assert_eq!(order_operator_ids(&ops).unwrap(), vec!["a", "b"]);

    let graph = DagGraph::from_operators(&ops).unwrap();
    assert_eq!(graph.dependencies_of("b"), vec!["a"]);
    assert_eq!(graph.dependents_of("a"), vec!["b"]);
}

#[test]
fn template_tasks_follow_dependency_order() {
    let mut later = op("later", &["first"]);
    later.position_x = Some(10.0);
    let ops = vec![later, op("first", &[])];

    let tasks = build_template_tasks(&ops).unwrap();
    assert_eq!(
        tasks.iter().map(|t| t.uuid.as_str()).collect::<Vec<_>>(),
        vec!["first", "later"]
    );
    assert_eq!(tasks[1].dependencies, vec!["first"]);
    assert_eq!(tasks[1].position_x, Some(10.0));

    let as_json = serde_json::to_value(&tasks[1]).unwrap();
    assert_eq!(as_json["taskId"], json!("task-later"));
}
