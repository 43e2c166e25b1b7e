// src/runs/lifecycle.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::dag::{Operator, order_operators};
use crate::engine::{EngineExperiment, NEWEST_FIRST, PipelineEngine};
use crate::errors::{PipewatchError, Result};
use crate::pipeline::{PipelineCompiler, PipelineContext};
use crate::runs::projector::{RunView, project_run_detail};
use crate::types::{RunContext, RunStatus};

/// Run id alias for the most recent run of a context.
pub const LATEST: &str = "latest";

/// Timestamp format of the job-name tag.
const TAG_FORMAT: &str = "%Y-%m-%d %H-%M-%S";

/// Everything needed to submit a new run.
#[derive(Debug, Clone)]
pub struct StartRun {
    pub project_id: String,
    pub context: RunContext,
    /// Shown to the running containers; defaults to the deployment id.
    pub deployment_name: Option<String>,
    pub operators: Vec<Operator>,
}

/// Acknowledgement returned by fire-and-forget operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub message: String,
}

impl Confirmation {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Engine job name: the run name tagged with a UTC timestamp, so repeated
/// submissions under one context never collide.
pub fn job_name(name: &str, now: DateTime<Utc>) -> String {
    format!("{name}-{}", now.format(TAG_FORMAT))
}

/// Start, list, inspect, terminate and retry runs.
///
/// Each call does its own engine round trips. Nothing is retried here;
/// engine failures go straight back to the caller.
pub struct RunController<E: PipelineEngine, C: PipelineCompiler> {
    engine: E,
    compiler: C,
    page_size: u32,
}

impl<E: PipelineEngine, C: PipelineCompiler> fmt::Debug for RunController<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunController")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl<E: PipelineEngine, C: PipelineCompiler> RunController<E, C> {
    pub fn new(engine: E, compiler: C, page_size: u32) -> Self {
        Self {
            engine,
            compiler,
            page_size,
        }
    }

    /// Compile and submit a run, then return its projected view.
    ///
    /// The compiled artifact is removed whether or not the submission
    /// succeeds.
    pub async fn start_run(&self, request: StartRun) -> Result<RunView> {
        self.start_run_at(request, Utc::now()).await
    }

    /// [`start_run`](Self::start_run) with an explicit tag time.
    pub async fn start_run_at(&self, request: StartRun, now: DateTime<Utc>) -> Result<RunView> {
        if request.operators.is_empty() {
            return Err(PipewatchError::BadRequest(
                "at least one operator is required".to_string(),
            ));
        }

        let ordered = order_operators(&request.operators)?;
        let name = request.context.run_name();
        let deployment_name = match &request.context {
            RunContext::Deployment(id) => Some(request.deployment_name.unwrap_or_else(|| id.clone())),
            RunContext::Experiment(_) => None,
        };
        let context = PipelineContext {
            project_id: request.project_id,
            run: request.context.clone(),
            deployment_name,
        };

        let artifact = self.compiler.compile(&name, &ordered, &context).await?;
        debug!(artifact = %artifact.display(), "pipeline compiled");

        let job = job_name(&name, now);
        let submitted = async {
            let experiment = self.ensure_experiment(request.context.id()).await?;
            self.engine
                .run_pipeline(&experiment.id, &job, &artifact)
                .await
        }
        .await;

        if let Err(err) = tokio::fs::remove_file(&artifact).await {
            warn!(artifact = %artifact.display(), error = %err, "failed to remove compiled pipeline");
        }

        let run = submitted?;
        info!(job = %job, run_id = %run.id, "run submitted");

        let detail = self.engine.get_run(&run.id).await?;
        project_run_detail(&detail)
    }

    /// Newest runs of a context, at most one page.
    ///
    /// A context the engine has never seen has no runs; that is not an
    /// error.
    pub async fn list_runs(&self, context: &RunContext) -> Result<Vec<RunView>> {
        let Some(experiment) = self.find_experiment(context.id()).await? else {
            debug!(context = %context.id(), "no engine experiment; no runs");
            return Ok(Vec::new());
        };

        let runs = self
            .engine
            .list_runs(&experiment.id, self.page_size, NEWEST_FIRST)
            .await?;

        let mut views = Vec::with_capacity(runs.len());
        for run in &runs {
            let detail = self.engine.get_run(&run.id).await?;
            views.push(project_run_detail(&detail)?);
        }
        Ok(views)
    }

    /// Id of the most recent run, or `None` when the context has no runs.
    pub async fn get_latest_run_id(&self, context: &RunContext) -> Result<Option<String>> {
        let Some(experiment) = self.find_experiment(context.id()).await? else {
            return Ok(None);
        };
        let runs = self.engine.list_runs(&experiment.id, 1, NEWEST_FIRST).await?;
        Ok(runs.into_iter().next().map(|run| run.id))
    }

    pub async fn get_run(&self, run_id: &str, context: &RunContext) -> Result<RunView> {
        let run_id = self.resolve_run_id(run_id, context).await?;
        let detail = self.engine.get_run(&run_id).await?;
        project_run_detail(&detail)
    }

    pub async fn terminate_run(&self, run_id: &str, context: &RunContext) -> Result<Confirmation> {
        let run_id = self.resolve_run_id(run_id, context).await?;
        self.engine.terminate_run(&run_id).await?;
        info!(run_id = %run_id, "run terminated");
        Ok(Confirmation::new("Run terminated"))
    }

    /// Retry a failed run. Any other status is rejected.
    pub async fn retry_run(&self, run_id: &str, context: &RunContext) -> Result<Confirmation> {
        let run_id = self.resolve_run_id(run_id, context).await?;
        let detail = self.engine.get_run(&run_id).await?;

        let status = detail.run.status.as_deref().map(RunStatus::from);
        if status != Some(RunStatus::Failed) {
            return Err(PipewatchError::BadRequest("Not a failed run".to_string()));
        }

        self.engine.retry_run(&detail.run.id).await?;
        info!(run_id = %detail.run.id, "run re-initiated");
        Ok(Confirmation::new("Run re-initiated successfully"))
    }

    /// Stop the latest run of a deployment that is being removed.
    ///
    /// A deployment without runs is fine and only logged.
    pub async fn undeploy(&self, deployment_id: &str) -> Result<()> {
        let context = RunContext::Deployment(deployment_id.to_string());
        match self.terminate_run(LATEST, &context).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                warn!(deployment = %deployment_id, error = %err, "nothing to undeploy");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn resolve_run_id(&self, run_id: &str, context: &RunContext) -> Result<String> {
        if run_id != LATEST {
            return Ok(run_id.to_string());
        }
        self.get_latest_run_id(context).await?.ok_or_else(|| {
            PipewatchError::NotFound(format!("no runs for {}", context.run_name()))
        })
    }

    async fn find_experiment(&self, name: &str) -> Result<Option<EngineExperiment>> {
        match self.engine.get_experiment(name).await {
            Ok(experiment) => Ok(Some(experiment)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn ensure_experiment(&self, name: &str) -> Result<EngineExperiment> {
        match self.find_experiment(name).await? {
            Some(experiment) => Ok(experiment),
            None => self.engine.create_experiment(name).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn job_name_is_tagged_with_utc_time() {
        let now = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            job_name("experiment-e1", now),
            "experiment-e1-2021-03-04 05-06-07"
        );
    }
}
