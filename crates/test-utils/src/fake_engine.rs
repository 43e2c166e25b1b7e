use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use pipewatch::dag::Operator;
use pipewatch::engine::{EngineExperiment, EngineFuture, EngineRun, PipelineEngine, RunDetail};
use pipewatch::errors::PipewatchError;
use pipewatch::pipeline::{ArgoCompiler, CompileFuture, PipelineCompiler, PipelineContext};

/// One call made against a [`FakeEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    GetExperiment(String),
    CreateExperiment(String),
    ListRuns {
        experiment_id: String,
        page_size: u32,
        sort_by: String,
    },
    RunPipeline {
        experiment_id: String,
        job_name: String,
        artifact: PathBuf,
    },
    GetRun(String),
    TerminateRun(String),
    RetryRun(String),
}

#[derive(Debug, Default)]
struct State {
    experiments: Vec<EngineExperiment>,
    /// (experiment id, run), oldest first.
    runs: Vec<(String, EngineRun)>,
    manifests: HashMap<String, String>,
    calls: Vec<EngineCall>,
    fail_submissions: bool,
    next_run: usize,
}

/// An in-memory execution engine that:
/// - stores experiments, runs and their manifests
/// - records every call it receives
/// - uses the submitted artifact itself as the new run's manifest.
///
/// Clones share state, so a test can give one to a `RunController` and keep
/// another for assertions.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an experiment grouping named `name` and return its id.
    pub fn with_experiment(&self, name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        ensure_experiment(&mut state, name).id
    }

    /// Add a run under the experiment `name` (created if missing). Runs added
    /// later are newer.
    pub fn add_run(&self, experiment: &str, run_id: &str, status: &str, manifest: &str) {
        let mut state = self.state.lock().unwrap();
        let experiment_id = ensure_experiment(&mut state, experiment).id;
        state.runs.push((
            experiment_id,
            EngineRun {
                id: run_id.to_string(),
                name: run_id.to_string(),
                status: Some(status.to_string()),
                created_at: Some(Utc::now()),
            },
        ));
        state
            .manifests
            .insert(run_id.to_string(), manifest.to_string());
    }

    /// Make `run_pipeline` fail with a 500.
    pub fn fail_submissions(&self) {
        self.state.lock().unwrap().fail_submissions = true;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn experiment_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.experiments.iter().map(|e| e.name.clone()).collect()
    }

    fn record(&self, call: EngineCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn ensure_experiment(state: &mut State, name: &str) -> EngineExperiment {
    if let Some(existing) = state.experiments.iter().find(|e| e.name == name) {
        return existing.clone();
    }
    let experiment = EngineExperiment {
        id: format!("exp-{name}"),
        name: name.to_string(),
    };
    state.experiments.push(experiment.clone());
    experiment
}

impl PipelineEngine for FakeEngine {
    fn get_experiment<'a>(&'a self, name: &'a str) -> EngineFuture<'a, EngineExperiment> {
        Box::pin(async move {
            self.record(EngineCall::GetExperiment(name.to_string()));
            let state = self.state.lock().unwrap();
            state
                .experiments
                .iter()
                .find(|e| e.name == name)
                .cloned()
                .ok_or_else(|| PipewatchError::NotFound(format!("experiment {name}")))
        })
    }

    fn create_experiment<'a>(&'a self, name: &'a str) -> EngineFuture<'a, EngineExperiment> {
        Box::pin(async move {
            self.record(EngineCall::CreateExperiment(name.to_string()));
            let mut state = self.state.lock().unwrap();
            Ok(ensure_experiment(&mut state, name))
        })
    }

    fn list_runs<'a>(
        &'a self,
        experiment_id: &'a str,
        page_size: u32,
        sort_by: &'a str,
    ) -> EngineFuture<'a, Vec<EngineRun>> {
        Box::pin(async move {
            self.record(EngineCall::ListRuns {
                experiment_id: experiment_id.to_string(),
                page_size,
                sort_by: sort_by.to_string(),
            });
            let state = self.state.lock().unwrap();
            Ok(state
                .runs
                .iter()
                .rev()
                .filter(|(exp, _)| exp == experiment_id)
                .take(page_size as usize)
                .map(|(_, run)| run.clone())
                .collect())
        })
    }

    fn run_pipeline<'a>(
        &'a self,
        experiment_id: &'a str,
        job_name: &'a str,
        artifact: &'a Path,
    ) -> EngineFuture<'a, EngineRun> {
        Box::pin(async move {
            self.record(EngineCall::RunPipeline {
                experiment_id: experiment_id.to_string(),
                job_name: job_name.to_string(),
                artifact: artifact.to_path_buf(),
            });

            let manifest = std::fs::read_to_string(artifact)?;

            let mut state = self.state.lock().unwrap();
            if state.fail_submissions {
                return Err(PipewatchError::Engine {
                    status: 500,
                    message: "submission rejected".to_string(),
                });
            }

            state.next_run += 1;
            let run = EngineRun {
                id: format!("run-{}", state.next_run),
                name: job_name.to_string(),
                status: Some("Running".to_string()),
                created_at: Some(Utc::now()),
            };
            state.runs.push((experiment_id.to_string(), run.clone()));
            state.manifests.insert(run.id.clone(), manifest);
            Ok(run)
        })
    }

    fn get_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, RunDetail> {
        Box::pin(async move {
            self.record(EngineCall::GetRun(run_id.to_string()));
            let state = self.state.lock().unwrap();
            let run = state
                .runs
                .iter()
                .find(|(_, run)| run.id == run_id)
                .map(|(_, run)| run.clone())
                .ok_or_else(|| PipewatchError::NotFound(format!("run {run_id}")))?;
            let workflow_manifest = state.manifests.get(run_id).cloned().unwrap_or_default();
            Ok(RunDetail {
                run,
                workflow_manifest,
            })
        })
    }

    fn terminate_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.record(EngineCall::TerminateRun(run_id.to_string()));
            Ok(())
        })
    }

    fn retry_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.record(EngineCall::RetryRun(run_id.to_string()));
            Ok(())
        })
    }
}

/// Wraps an [`ArgoCompiler`] and records the operator order of every
/// compile call.
#[derive(Debug, Clone)]
pub struct RecordingCompiler {
    inner: ArgoCompiler,
    compiled: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingCompiler {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            inner: ArgoCompiler::new(work_dir, "runner:test"),
            compiled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Operator ids passed to each compile call, in the order received.
    pub fn compiled(&self) -> Vec<Vec<String>> {
        self.compiled.lock().unwrap().clone()
    }
}

impl PipelineCompiler for RecordingCompiler {
    fn compile<'a>(
        &'a self,
        name: &'a str,
        operators: &'a [Operator],
        context: &'a PipelineContext,
    ) -> CompileFuture<'a> {
        self.compiled
            .lock()
            .unwrap()
            .push(operators.iter().map(|op| op.uuid.clone()).collect());
        self.inner.compile(name, operators, context)
    }
}
