// src/engine/backend.rs

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::engine::{EngineExperiment, EngineRun, RunDetail};
use crate::errors::Result;

/// Boxed future returned by engine calls.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Operations pipewatch needs from the pipeline-execution engine.
///
/// Implementations report a missing experiment or run as
/// `PipewatchError::NotFound`. Transient failures are returned as-is; no
/// call is retried here.
pub trait PipelineEngine: Send + Sync {
    /// Look up an experiment grouping by name.
    fn get_experiment<'a>(&'a self, name: &'a str) -> EngineFuture<'a, EngineExperiment>;

    fn create_experiment<'a>(&'a self, name: &'a str) -> EngineFuture<'a, EngineExperiment>;

    /// List up to `page_size` runs of an experiment, ordered by `sort_by`.
    fn list_runs<'a>(
        &'a self,
        experiment_id: &'a str,
        page_size: u32,
        sort_by: &'a str,
    ) -> EngineFuture<'a, Vec<EngineRun>>;

    /// Submit the compiled artifact at `artifact` as a new run.
    fn run_pipeline<'a>(
        &'a self,
        experiment_id: &'a str,
        job_name: &'a str,
        artifact: &'a Path,
    ) -> EngineFuture<'a, EngineRun>;

    fn get_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, RunDetail>;

    /// Request termination. Does not wait for containers to stop.
    fn terminate_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, ()>;

    fn retry_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, ()>;
}
