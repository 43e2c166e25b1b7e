// src/pipeline/compiler.rs

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::pin::Pin;

use tracing::debug;

use crate::dag::Operator;
use crate::errors::Result;
use crate::pipeline::manifest::{
    Arguments, Container, DagTask, DagTemplate, EnvVar, Inputs, Parameter, Template,
    WorkflowManifest, WorkflowMetadata, WorkflowSpec, PARAMETER_ENV_PREFIX,
    TASK_VOLUME_PREFIX, task_volume_parameter,
};
use crate::types::RunContext;

/// Identifiers threaded into every compiled operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    pub project_id: String,
    pub run: RunContext,
    /// Display name of the deployment, when `run` is a deployment.
    pub deployment_name: Option<String>,
}

pub type CompileFuture<'a> = Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;

/// Turns an ordered operator list into a pipeline submission artifact.
pub trait PipelineCompiler: Send + Sync {
    /// Write the artifact and return its path.
    ///
    /// `operators` must already be in dependency order. Every call gets its
    /// own file, so concurrent submissions under one name never share an
    /// artifact. The caller owns the returned file and removes it once
    /// submitted.
    fn compile<'a>(
        &'a self,
        name: &'a str,
        operators: &'a [Operator],
        context: &'a PipelineContext,
    ) -> CompileFuture<'a>;
}

/// Compiles operators into an Argo `Workflow` JSON manifest.
///
/// Layout of the produced manifest:
/// - one DAG template named after the pipeline, with one task per operator;
/// - one container template per operator, named after the operator, which
///   declares the task's volume-claim input parameter and passes operator
///   parameters as `PARAMETER_<name>` environment variables holding JSON.
#[derive(Debug, Clone)]
pub struct ArgoCompiler {
    work_dir: PathBuf,
    image: String,
}

impl ArgoCompiler {
    pub fn new(work_dir: impl Into<PathBuf>, image: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            image: image.into(),
        }
    }

    /// Build the manifest without touching the filesystem.
    pub fn build_manifest(
        &self,
        name: &str,
        operators: &[Operator],
        context: &PipelineContext,
    ) -> Result<WorkflowManifest> {
        let dag_tasks = operators.iter().map(dag_task_for).collect();

        let mut templates = vec![Template {
            name: name.to_string(),
            dag: Some(DagTemplate { tasks: dag_tasks }),
            ..Template::default()
        }];

        for op in operators {
            templates.push(self.container_template_for(op, context)?);
        }

        Ok(WorkflowManifest {
            api_version: Some("argoproj.io/v1alpha1".to_string()),
            kind: Some("Workflow".to_string()),
            metadata: WorkflowMetadata {
                name: None,
                generate_name: Some(format!("{name}-")),
            },
            spec: WorkflowSpec {
                entrypoint: Some(name.to_string()),
                templates,
            },
            status: Default::default(),
        })
    }

    fn container_template_for(&self, op: &Operator, context: &PipelineContext) -> Result<Template> {
        let volume_param = task_volume_parameter(&op.task_id);

        let mut env = vec![
            env_var("PROJECT_ID", &context.project_id),
            env_var("OPERATOR_ID", &op.uuid),
            env_var("TASK_ID", &op.task_id),
            env_var(
                "TASK_VOLUME",
                &format!("{{{{inputs.parameters.{volume_param}}}}}"),
            ),
        ];

        match &context.run {
            RunContext::Experiment(id) => env.push(env_var("EXPERIMENT_ID", id)),
            RunContext::Deployment(id) => {
                env.push(env_var("DEPLOYMENT_ID", id));
                let display = context.deployment_name.as_deref().unwrap_or(id);
                env.push(env_var("DEPLOYMENT_NAME", display));
            }
        }

        for (key, value) in &op.parameters {
            env.push(env_var(
                &format!("{PARAMETER_ENV_PREFIX}{key}"),
                &serde_json::to_string(value)?,
            ));
        }

        Ok(Template {
            name: op.uuid.clone(),
            dag: None,
            inputs: Some(Inputs {
                parameters: Some(vec![Parameter {
                    name: volume_param,
                    value: None,
                }]),
            }),
            container: Some(Container {
                image: self.image.clone(),
                command: Vec::new(),
                args: Vec::new(),
                env: Some(env),
            }),
        })
    }
}

impl PipelineCompiler for ArgoCompiler {
    fn compile<'a>(
        &'a self,
        name: &'a str,
        operators: &'a [Operator],
        context: &'a PipelineContext,
    ) -> CompileFuture<'a> {
        Box::pin(async move {
            let manifest = self.build_manifest(name, operators, context)?;
            let bytes = serde_json::to_vec_pretty(&manifest)?;
            let work_dir = self.work_dir.clone();
            let prefix = format!("{name}-");

            let path = tokio::task::spawn_blocking(move || -> io::Result<PathBuf> {
                fs::create_dir_all(&work_dir)?;
                let mut file = tempfile::Builder::new()
                    .prefix(&prefix)
                    .suffix(".json")
                    .tempfile_in(&work_dir)?;
                file.write_all(&bytes)?;
                let (_, path) = file.keep()?;
                Ok(path)
            })
            .await
            .map_err(io::Error::other)??;

            debug!(pipeline = %name, path = ?path, operators = operators.len(), "compiled pipeline");
            Ok(path)
        })
    }
}

fn dag_task_for(op: &Operator) -> DagTask {
    DagTask {
        name: op.uuid.clone(),
        template: Some(op.uuid.clone()),
        dependencies: op.dependencies.clone(),
        arguments: Some(Arguments {
            parameters: vec![Parameter {
                name: task_volume_parameter(&op.task_id),
                value: Some(format!("{TASK_VOLUME_PREFIX}{}", op.task_id)),
            }],
        }),
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> PipelineContext {
        PipelineContext {
            project_id: "p1".into(),
            run: RunContext::Experiment("e1".into()),
            deployment_name: None,
        }
    }

    #[test]
    fn manifest_has_one_dag_and_one_template_per_operator() {
        let mut a = Operator::new("a", "t1");
        a.parameters.insert("coef".into(), json!(0.1));
        let mut b = Operator::new("b", "t2");
        b.dependencies = vec!["a".into()];

        let compiler = ArgoCompiler::new(".", "runner:latest");
        let manifest = compiler
            .build_manifest("experiment-e1", &[a, b], &context())
            .unwrap();

        let dag = manifest.dag_template().unwrap();
        assert_eq!(dag.name, "experiment-e1");
        let tasks = &dag.dag.as_ref().unwrap().tasks;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].dependencies, vec!["a".to_string()]);

        let a_template = manifest.spec.templates.iter().find(|t| t.name == "a").unwrap();
        let env = a_template.container.as_ref().unwrap().env.as_ref().unwrap();
        assert!(env.iter().any(|e| e.name == "PARAMETER_coef" && e.value.as_deref() == Some("0.1")));
        assert!(env.iter().any(|e| e.name == "EXPERIMENT_ID" && e.value.as_deref() == Some("e1")));

        let inputs = a_template.inputs.as_ref().unwrap().parameters.as_ref().unwrap();
        assert_eq!(inputs[0].name, "vol-task-t1-name");
    }

    #[tokio::test]
    async fn compile_writes_artifact_into_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = ArgoCompiler::new(dir.path().join("pipelines"), "runner:latest");

        let path = compiler
            .compile("experiment-e1", &[Operator::new("a", "t1")], &context())
            .await
            .unwrap();

        assert_eq!(path.parent(), Some(dir.path().join("pipelines").as_path()));
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("experiment-e1-") && file_name.ends_with(".json"));
        let raw = std::fs::read_to_string(&path).unwrap();
        let manifest = WorkflowManifest::from_json(&raw).unwrap();
        assert_eq!(manifest.spec.entrypoint.as_deref(), Some("experiment-e1"));
    }

    #[tokio::test]
    async fn each_compile_gets_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = ArgoCompiler::new(dir.path(), "runner:latest");
        let ops = [Operator::new("a", "t1")];
        let ctx = context();

        let (first, second) = tokio::join!(
            compiler.compile("experiment-e1", &ops, &ctx),
            compiler.compile("experiment-e1", &ops, &ctx),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_ne!(first, second);
        std::fs::remove_file(&first).unwrap();
        assert!(second.exists());
    }
}
