// src/runs/projector.rs

//! Per-operator view of one pipeline run.
//!
//! Views are recomputed from the engine's live manifest on every query and
//! never persisted. Node phases pass through verbatim; only the watcher
//! translates state vocabulary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{EngineRun, RunDetail};
use crate::errors::{PipewatchError, Result};
use crate::pipeline::manifest::{
    EnvVar, NodeStatus, Template, WorkflowManifest, PARAMETER_ENV_PREFIX, TERMINATED_MESSAGE,
    VOLUME_TASK_PREFIX, task_id_from_volume_parameter,
};
use crate::types::{OperatorId, ParameterMap, RunStatus};

/// What the API layer shows for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub uuid: String,
    pub operators: BTreeMap<OperatorId, RunOperatorView>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOperatorView {
    pub status: RunStatus,
    pub parameters: ParameterMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Status given to operators before any node reports.
///
/// Once the whole workflow has finished, an operator with no node never
/// ran, so it is `Unset` rather than `Pending`.
pub fn default_node_status(phase: Option<&str>) -> RunStatus {
    match phase.map(RunStatus::from) {
        Some(status) if status.is_finished_phase() => RunStatus::Unset,
        _ => RunStatus::Pending,
    }
}

/// Status of one node: the interruption marker wins over the raw phase.
pub fn node_status(node: &NodeStatus) -> Option<RunStatus> {
    if node.message.as_deref() == Some(TERMINATED_MESSAGE) {
        return Some(RunStatus::Terminated);
    }
    node.phase.as_deref().map(RunStatus::from)
}

/// Build the view of `run` from its manifest.
pub fn project_run(run: &EngineRun, manifest: &WorkflowManifest) -> Result<RunView> {
    let dag = manifest
        .dag_template()
        .and_then(|t| t.dag.as_ref())
        .ok_or_else(|| {
            PipewatchError::Malformed(format!("run {} has no DAG template", run.id))
        })?;

    let default_status = default_node_status(manifest.status.phase.as_deref());

    let mut operators: BTreeMap<OperatorId, RunOperatorView> = dag
        .tasks
        .iter()
        .filter(|task| !task.name.starts_with(VOLUME_TASK_PREFIX))
        .map(|task| {
            (
                task.name.clone(),
                RunOperatorView {
                    status: default_status.clone(),
                    parameters: ParameterMap::new(),
                    task_id: None,
                },
            )
        })
        .collect();

    for node in manifest.status.nodes.values() {
        let Some(view) = operators.get_mut(&node.display_name) else {
            continue;
        };
        if let Some(status) = node_status(node) {
            view.status = status;
        }
    }

    for template in &manifest.spec.templates {
        let Some(view) = operators.get_mut(&template.name) else {
            continue;
        };
        if let Some(task_id) = template_task_id(template) {
            view.task_id = Some(task_id.to_string());
        }
        if let Some(env) = template.container.as_ref().and_then(|c| c.env.as_ref()) {
            view.parameters = decode_parameters(&template.name, env)?;
        }
    }

    Ok(RunView {
        uuid: run.id.clone(),
        operators,
        created_at: run.created_at,
    })
}

/// Parse the raw manifest of `detail` and project it.
pub fn project_run_detail(detail: &RunDetail) -> Result<RunView> {
    let manifest = WorkflowManifest::from_json(&detail.workflow_manifest).map_err(|e| {
        PipewatchError::Malformed(format!("run {}: unreadable manifest: {e}", detail.run.id))
    })?;
    project_run(&detail.run, &manifest)
}

fn template_task_id(template: &Template) -> Option<&str> {
    template
        .inputs
        .as_ref()?
        .parameters
        .as_ref()?
        .iter()
        .find_map(|p| task_id_from_volume_parameter(&p.name))
}

fn decode_parameters(operator: &str, env: &[EnvVar]) -> Result<ParameterMap> {
    let mut parameters = ParameterMap::new();
    for var in env {
        let Some(name) = var.name.strip_prefix(PARAMETER_ENV_PREFIX) else {
            continue;
        };
        // No value at all means no parameter; "null" is a real JSON null.
        let Some(raw) = var.value.as_deref() else {
            continue;
        };
        let value = serde_json::from_str(raw).map_err(|e| {
            PipewatchError::Malformed(format!(
                "operator {operator}: parameter {name} is not JSON: {e}"
            ))
        })?;
        parameters.insert(name.to_string(), value);
    }
    Ok(parameters)
}
