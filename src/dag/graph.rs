// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::operator::Operator;
use crate::errors::{PipewatchError, Result};
use crate::types::OperatorId;

/// Operator graph keyed by operator id.
///
/// Nodes are inserted in input order, so a node's index is also its
/// position in the slice the graph was built from. Edges point from a
/// dependency to the operator that waits on it.
#[derive(Debug, Clone)]
pub struct DagGraph {
    graph: DiGraph<OperatorId, ()>,
    index: HashMap<OperatorId, NodeIndex>,
}

impl DagGraph {
    /// Build a graph from operators.
    ///
    /// Fails on duplicate ids and on dependencies that name an operator not
    /// present in `operators`. Cycles are accepted here and reported by
    /// [`DagGraph::stable_toposort`].
    pub fn from_operators(operators: &[Operator]) -> Result<Self> {
        let mut graph: DiGraph<OperatorId, ()> = DiGraph::with_capacity(operators.len(), 0);
        let mut index = HashMap::with_capacity(operators.len());

        for op in operators {
            if index.contains_key(&op.uuid) {
                return Err(PipewatchError::DuplicateOperator(op.uuid.clone()));
            }
            let node = graph.add_node(op.uuid.clone());
            index.insert(op.uuid.clone(), node);
        }

        for op in operators {
            let target = index[&op.uuid];
            for dep in &op.dependencies {
                let source = index.get(dep).copied().ok_or_else(|| {
                    PipewatchError::UnknownDependency {
                        operator: op.uuid.clone(),
                        dependency: dep.clone(),
                    }
                })?;
                // `update_edge` collapses repeated entries in `dependencies`.
                graph.update_edge(source, target, ());
            }
        }

        Ok(Self { graph, index })
    }

    /// Immediate dependencies of an operator, in input order.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Operators that list `id` as a dependency, in input order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.neighbours(id, Direction::Outgoing)
    }

    fn neighbours(&self, id: &str, dir: Direction) -> Vec<&str> {
        let Some(&node) = self.index.get(id) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(node, dir).collect();
        found.sort();
        found.into_iter().map(|n| self.graph[n].as_str()).collect()
    }

    /// Place operators in repeated passes over the input.
    ///
    /// Each pass walks the operators in input order and places every one
    /// whose dependencies are all placed, including those placed earlier in
    /// the same pass. An operator scanned before its last dependency waits
    /// for the next pass. A pass that places nothing means the remaining
    /// operators sit on a cycle. Returns input positions.
    pub fn stable_toposort(&self) -> Result<Vec<usize>> {
        let n = self.graph.node_count();
        let mut placed = vec![false; n];
        let mut order = Vec::with_capacity(n);

        while order.len() < n {
            let before = order.len();

            for node in self.graph.node_indices() {
                if placed[node.index()] {
                    continue;
                }
                let ready = self
                    .graph
                    .neighbors_directed(node, Direction::Incoming)
                    .all(|dep| placed[dep.index()]);
                if ready {
                    placed[node.index()] = true;
                    order.push(node.index());
                }
            }

            if order.len() == before {
                let stuck: Vec<OperatorId> = self
                    .graph
                    .node_indices()
                    .filter(|node| !placed[node.index()])
                    .map(|node| self.graph[node].clone())
                    .collect();
                return Err(PipewatchError::CyclicDependency(stuck));
            }
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(id: &str, deps: &[&str]) -> Operator {
        let mut o = Operator::new(id, format!("task-{id}"));
        o.dependencies = deps.iter().map(|d| d.to_string()).collect();
        o
    }

    #[test]
    fn adjacency_follows_dependencies() {
        let ops = vec![op("a", &[]), op("b", &["a"]), op("c", &["a", "b"])];
        let graph = DagGraph::from_operators(&ops).unwrap();

        assert_eq!(graph.dependencies_of("c"), vec!["a", "b"]);
        assert_eq!(graph.dependents_of("a"), vec!["b", "c"]);
        assert!(graph.dependencies_of("missing").is_empty());
    }

    #[test]
    fn repeated_dependency_counts_once() {
        let ops = vec![op("a", &[]), op("b", &["a", "a"])];
        let graph = DagGraph::from_operators(&ops).unwrap();
        assert_eq!(graph.stable_toposort().unwrap(), vec![0, 1]);
    }

    #[test]
    fn late_eligible_operator_waits_for_next_pass() {
        let ops = vec![op("x", &["root"]), op("root", &[]), op("y", &["root"]), op("z", &[])];
        let graph = DagGraph::from_operators(&ops).unwrap();
        assert_eq!(graph.stable_toposort().unwrap(), vec![1, 2, 3, 0]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let ops = vec![op("a", &["a"]), op("b", &[])];
        let graph = DagGraph::from_operators(&ops).unwrap();
        match graph.stable_toposort() {
            Err(PipewatchError::CyclicDependency(ids)) => assert_eq!(ids, vec!["a".to_string()]),
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let ops = vec![op("a", &[]), op("a", &[])];
        assert!(matches!(
            DagGraph::from_operators(&ops),
            Err(PipewatchError::DuplicateOperator(id)) if id == "a"
        ));
    }
}
