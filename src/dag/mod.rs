// src/dag/mod.rs

//! Operator graphs and dependency ordering.
//!
//! - [`operator`] holds the operator record and the template task shape.
//! - [`graph`] builds a petgraph-backed DAG from operators and provides a
//!   stable topological sort.
//! - [`resolver`] is the public entry point that turns an unordered set of
//!   operators into execution order.
//! - [`template`] saves an ordered graph as reusable template tasks.

pub mod graph;
pub mod operator;
pub mod resolver;
pub mod template;

pub use graph::DagGraph;
pub use operator::{Operator, TemplateTask};
pub use resolver::{order_operator_ids, order_operators};
pub use template::build_template_tasks;
