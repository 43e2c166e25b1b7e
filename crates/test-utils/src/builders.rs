#![allow(dead_code)]

use pipewatch::dag::Operator;
use pipewatch::pipeline::manifest::{
    Container, DagTask, DagTemplate, EnvVar, Inputs, NodeStatus, Parameter, Template,
    WorkflowManifest, task_volume_parameter,
};
use pipewatch::watch::{EventType, ObjectMeta, ResourceObject, ResourceStatus, WatchEvent};
use serde_json::Value;

/// Builder for `Operator` to simplify test setup.
pub struct OperatorBuilder {
    operator: Operator,
}

impl OperatorBuilder {
    pub fn new(uuid: &str) -> Self {
        Self {
            operator: Operator::new(uuid, format!("task-{uuid}")),
        }
    }

    pub fn task(mut self, task_id: &str) -> Self {
        self.operator.task_id = task_id.to_string();
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.operator.dependencies.push(dep.to_string());
        self
    }

    pub fn param(mut self, name: &str, value: Value) -> Self {
        self.operator.parameters.insert(name.to_string(), value);
        self
    }

    pub fn build(self) -> Operator {
        self.operator
    }
}

/// Shorthand for an operator with the given dependencies.
pub fn op(uuid: &str, deps: &[&str]) -> Operator {
    deps.iter()
        .fold(OperatorBuilder::new(uuid), |b, d| b.after(d))
        .build()
}

/// Builder for engine-side workflow manifests.
///
/// Operators added with [`ManifestBuilder::operator`] get a DAG task and a
/// template; everything else is added piecemeal.
pub struct ManifestBuilder {
    manifest: WorkflowManifest,
    dag_tasks: Vec<DagTask>,
    with_dag: bool,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: WorkflowManifest::default(),
            dag_tasks: Vec::new(),
            with_dag: true,
        }
    }

    pub fn phase(mut self, phase: &str) -> Self {
        self.manifest.status.phase = Some(phase.to_string());
        self
    }

    /// Add an operator task plus a template declaring its volume input.
    pub fn operator(mut self, uuid: &str, task_id: &str) -> Self {
        self.dag_tasks.push(DagTask {
            name: uuid.to_string(),
            template: Some(uuid.to_string()),
            ..DagTask::default()
        });
        self.manifest.spec.templates.push(Template {
            name: uuid.to_string(),
            inputs: Some(Inputs {
                parameters: Some(vec![Parameter {
                    name: task_volume_parameter(task_id),
                    value: None,
                }]),
            }),
            ..Template::default()
        });
        self
    }

    /// Add a DAG task that is not an operator (e.g. a volume helper).
    pub fn helper_task(mut self, name: &str) -> Self {
        self.dag_tasks.push(DagTask {
            name: name.to_string(),
            ..DagTask::default()
        });
        self
    }

    /// Add an env var to the template of `uuid`. `None` leaves out the value.
    pub fn env(mut self, uuid: &str, name: &str, value: Option<&str>) -> Self {
        let template = self
            .manifest
            .spec
            .templates
            .iter_mut()
            .find(|t| t.name == uuid)
            .expect("env() needs a template added with operator()");
        let container = template.container.get_or_insert_with(Container::default);
        container.env.get_or_insert_with(Vec::new).push(EnvVar {
            name: name.to_string(),
            value: value.map(str::to_string),
        });
        self
    }

    pub fn node(mut self, id: &str, display_name: &str, phase: &str, message: Option<&str>) -> Self {
        self.manifest.status.nodes.insert(
            id.to_string(),
            NodeStatus {
                display_name: display_name.to_string(),
                phase: Some(phase.to_string()),
                message: message.map(str::to_string),
            },
        );
        self
    }

    pub fn without_dag(mut self) -> Self {
        self.with_dag = false;
        self
    }

    pub fn build(mut self) -> WorkflowManifest {
        if self.with_dag {
            self.manifest.spec.templates.insert(
                0,
                Template {
                    name: "pipeline".to_string(),
                    dag: Some(DagTemplate {
                        tasks: self.dag_tasks,
                    }),
                    ..Template::default()
                },
            );
        }
        self.manifest
    }

    pub fn build_json(self) -> String {
        serde_json::to_string(&self.build()).expect("manifest serializes")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Deployment event with an optional `status.state`.
pub fn deployment_event(
    kind: EventType,
    name: &str,
    state: Option<&str>,
    resource_version: &str,
) -> WatchEvent {
    WatchEvent {
        kind,
        object: ResourceObject {
            metadata: ObjectMeta {
                name: name.to_string(),
                resource_version: Some(resource_version.to_string()),
            },
            status: state.map(|s| ResourceStatus {
                state: Some(s.to_string()),
            }),
        },
    }
}

pub fn modified(name: &str, state: &str, resource_version: &str) -> WatchEvent {
    deployment_event(EventType::Modified, name, Some(state), resource_version)
}
