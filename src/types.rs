use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical operator identifier type.
pub type OperatorId = String;

/// Operator parameters: name -> JSON value.
pub type ParameterMap = BTreeMap<String, serde_json::Value>;

/// Status vocabulary shared by run views and deployment records.
///
/// The engine and the orchestration system may report phases we do not
/// know about; those are kept verbatim in `Other` so that projecting a
/// status never loses information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    /// The run finished before this operator reported anything.
    Unset,
    Pending,
    Running,
    Succeeded,
    Failed,
    Terminated,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Unset => "Unset",
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Succeeded => "Succeeded",
            RunStatus::Failed => "Failed",
            RunStatus::Terminated => "Terminated",
            RunStatus::Other(raw) => raw.as_str(),
        }
    }

    /// Whole-workflow phases after which no more node updates arrive.
    pub fn is_finished_phase(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

impl From<&str> for RunStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "Unset" => RunStatus::Unset,
            "Pending" => RunStatus::Pending,
            "Running" => RunStatus::Running,
            "Succeeded" => RunStatus::Succeeded,
            "Failed" => RunStatus::Failed,
            "Terminated" => RunStatus::Terminated,
            other => RunStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for RunStatus {
    fn from(raw: String) -> Self {
        RunStatus::from(raw.as_str())
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The logical execution context a run belongs to.
///
/// A run is scoped to exactly one of these, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContext {
    Experiment(String),
    Deployment(String),
}

impl RunContext {
    /// Identifier of the experiment or deployment.
    ///
    /// This is also the name of the engine-level experiment that groups the
    /// context's runs.
    pub fn id(&self) -> &str {
        match self {
            RunContext::Experiment(id) | RunContext::Deployment(id) => id,
        }
    }

    /// Pipeline name, e.g. `experiment-<id>` or `deployment-<id>`.
    pub fn run_name(&self) -> String {
        match self {
            RunContext::Experiment(id) => format!("experiment-{id}"),
            RunContext::Deployment(id) => format!("deployment-{id}"),
        }
    }
}
