// src/runs/mod.rs

//! Pipeline runs: projecting engine manifests into run views and driving
//! the run lifecycle against the engine.

pub mod lifecycle;
pub mod projector;

pub use lifecycle::{Confirmation, LATEST, RunController, StartRun, job_name};
pub use projector::{RunOperatorView, RunView, project_run, project_run_detail};
