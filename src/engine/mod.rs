// src/engine/mod.rs

//! Execution-engine client.
//!
//! The run lifecycle talks to a [`PipelineEngine`] instead of a concrete
//! HTTP client, so tests can swap in an in-memory engine while production
//! uses [`KfpClient`] against the Kubeflow Pipelines REST API.

pub mod backend;
pub mod kfp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use backend::{EngineFuture, PipelineEngine};
pub use kfp::KfpClient;

/// Sort key for listing runs newest first.
pub const NEWEST_FIRST: &str = "created_at desc";

/// Engine-level grouping of runs (one per experiment or deployment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineExperiment {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Run record as the engine reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineRun {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Engine-wide run status, e.g. `Running` or `Failed`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A run together with its raw workflow manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDetail {
    pub run: EngineRun,
    /// JSON-encoded workflow manifest.
    pub workflow_manifest: String,
}
