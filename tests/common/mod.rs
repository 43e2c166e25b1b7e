#![allow(dead_code)]

pub use pipewatch_test_utils::builders;
pub use pipewatch_test_utils::{init_tracing, with_timeout};

use pipewatch::dag::Operator;

/// Ids of `operators`, in order.
pub fn ids(operators: &[Operator]) -> Vec<String> {
    operators.iter().map(|op| op.uuid.clone()).collect()
}

/// Position of `id` in an ordered id list.
pub fn position(order: &[String], id: &str) -> usize {
    order
        .iter()
        .position(|x| x == id)
        .unwrap_or_else(|| panic!("{id} missing from {order:?}"))
}
