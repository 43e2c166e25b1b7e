// src/dag/template.rs

use crate::dag::operator::{Operator, TemplateTask};
use crate::dag::resolver::order_operators;
use crate::errors::Result;

/// Snapshot an experiment graph as template tasks, in execution order.
pub fn build_template_tasks(operators: &[Operator]) -> Result<Vec<TemplateTask>> {
    let ordered = order_operators(operators)?;
    Ok(ordered.iter().map(TemplateTask::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_keeps_layout_and_order() {
        let mut train = Operator::new("train", "task-train");
        train.dependencies = vec!["load".into()];
        train.position_x = Some(0.3);
        train.position_y = Some(0.5);
        let load = Operator::new("load", "task-load");

        let tasks = build_template_tasks(&[train, load]).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].uuid, "load");
        assert_eq!(tasks[1].uuid, "train");
        assert_eq!(tasks[1].task_id, "task-train");
        assert_eq!(tasks[1].dependencies, vec!["load".to_string()]);
        assert_eq!(tasks[1].position_x, Some(0.3));
    }
}
