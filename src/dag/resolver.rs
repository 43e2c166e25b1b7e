// src/dag/resolver.rs

//! Dependency ordering for operator graphs.
//!
//! Every operator is placed after all the operators it depends on. Placement
//! runs in passes over the input; within a pass operators keep their input
//! order, and one whose dependency was placed later in the same pass waits
//! for the next pass. The same input always produces the same sequence.
//!
//! Malformed graphs fail fast: an unknown dependency id yields
//! `UnknownDependency`, and operators that can never become eligible
//! (a cycle, including self-dependencies) yield `CyclicDependency`.

use tracing::debug;

use crate::dag::graph::DagGraph;
use crate::dag::operator::Operator;
use crate::errors::Result;
use crate::types::OperatorId;

/// Return the operators in dependency order.
pub fn order_operators(operators: &[Operator]) -> Result<Vec<Operator>> {
    let graph = DagGraph::from_operators(operators)?;
    let order = graph.stable_toposort()?;

    debug!(count = order.len(), "ordered operators by dependencies");

    Ok(order.into_iter().map(|i| operators[i].clone()).collect())
}

/// Same as [`order_operators`] but only returns the ids.
pub fn order_operator_ids(operators: &[Operator]) -> Result<Vec<OperatorId>> {
    let graph = DagGraph::from_operators(operators)?;
    let order = graph.stable_toposort()?;
    Ok(order.into_iter().map(|i| operators[i].uuid.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipewatchError;

    fn op(id: &str, deps: &[&str]) -> Operator {
        let mut o = Operator::new(id, "t");
        o.dependencies = deps.iter().map(|d| d.to_string()).collect();
        o
    }

    #[test]
    fn empty_input_yields_empty_order() {
        assert!(order_operator_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn dependencies_come_first() {
        let ops = vec![op("c", &["b"]), op("b", &["a"]), op("a", &[])];
        assert_eq!(order_operator_ids(&ops).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let ops = vec![op("x", &["root"]), op("root", &[]), op("y", &["root"]), op("z", &[])];
        assert_eq!(order_operator_ids(&ops).unwrap(), vec!["root", "y", "z", "x"]);
    }

    #[test]
    fn unknown_dependency_fails_fast() {
        let ops = vec![op("a", &["ghost"])];
        match order_operators(&ops) {
            Err(PipewatchError::UnknownDependency { operator, dependency }) => {
                assert_eq!(operator, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected UnknownDependency, got {other:?}"),
        }
    }
}
