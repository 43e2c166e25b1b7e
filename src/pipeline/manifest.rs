// src/pipeline/manifest.rs

//! Typed view of the Argo `Workflow` manifest.
//!
//! Only the fields that pipewatch writes (when compiling) or reads (when
//! projecting a run) are modelled. Everything else in the engine's manifest
//! is ignored on deserialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Input parameter prefix carrying a task's volume claim name.
pub const TASK_VOLUME_PREFIX: &str = "vol-task-";
/// Suffix of the volume-claim input parameter.
pub const TASK_VOLUME_SUFFIX: &str = "-name";
/// Prefix of DAG tasks that provision volumes rather than run operators.
pub const VOLUME_TASK_PREFIX: &str = "vol-";
/// Environment variable prefix for operator parameters.
pub const PARAMETER_ENV_PREFIX: &str = "PARAMETER_";
/// Node message the engine sets on nodes of a terminated run.
pub const TERMINATED_MESSAGE: &str = "terminated";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: WorkflowMetadata,
    #[serde(default)]
    pub spec: WorkflowSpec,
    #[serde(default)]
    pub status: WorkflowStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub templates: Vec<Template>,
}

/// One workflow template.
///
/// A template is DAG-shaped (`dag` set), a container spec (`container`
/// set), or only declares inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag: Option<DagTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Inputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagTemplate {
    #[serde(default)]
    pub tasks: Vec<DagTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DagTask {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvVar>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatus {
    /// Engine-wide run phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Internal node id -> node status.
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkflowManifest {
    /// Parse the JSON string the engine returns for a run.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// The single DAG-shaped template, if any.
    pub fn dag_template(&self) -> Option<&Template> {
        self.spec.templates.iter().find(|t| t.dag.is_some())
    }
}

/// Name of the input parameter that carries a task's volume claim.
pub fn task_volume_parameter(task_id: &str) -> String {
    format!("{TASK_VOLUME_PREFIX}{task_id}{TASK_VOLUME_SUFFIX}")
}

/// Recover the task id embedded in a volume-claim parameter name.
pub fn task_id_from_volume_parameter(name: &str) -> Option<&str> {
    name.strip_prefix(TASK_VOLUME_PREFIX)?
        .strip_suffix(TASK_VOLUME_SUFFIX)
}
