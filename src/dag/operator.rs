// src/dag/operator.rs

use serde::{Deserialize, Serialize};

use crate::types::{OperatorId, ParameterMap, RunStatus};

/// One node of an experiment or deployment graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub uuid: OperatorId,
    /// Task definition this operator runs.
    pub task_id: String,
    /// Operators (in the same graph) that must finish first.
    #[serde(default)]
    pub dependencies: Vec<OperatorId>,
    /// Canvas coordinates. Cosmetic only.
    #[serde(default)]
    pub position_x: Option<f64>,
    #[serde(default)]
    pub position_y: Option<f64>,
    #[serde(default = "default_status")]
    pub status: RunStatus,
    #[serde(default)]
    pub parameters: ParameterMap,
}

fn default_status() -> RunStatus {
    RunStatus::Unset
}

impl Operator {
    pub fn new(uuid: impl Into<OperatorId>, task_id: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            task_id: task_id.into(),
            dependencies: Vec::new(),
            position_x: None,
            position_y: None,
            status: default_status(),
            parameters: ParameterMap::new(),
        }
    }
}

/// An operator as stored inside a saved template.
///
/// JSON arrays keep their order, so the position in the template list is the
/// execution order and no separate index is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTask {
    pub uuid: OperatorId,
    pub task_id: String,
    pub dependencies: Vec<OperatorId>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
}

impl From<&Operator> for TemplateTask {
    fn from(op: &Operator) -> Self {
        Self {
            uuid: op.uuid.clone(),
            task_id: op.task_id.clone(),
            dependencies: op.dependencies.clone(),
            position_x: op.position_x,
            position_y: op.position_y,
        }
    }
}
