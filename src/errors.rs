// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipewatchError {
    /// A referenced run, experiment, deployment or operator does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is invalid for the current state or input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The watch history horizon expired (HTTP 410 Gone).
    ///
    /// Raised by event sources and consumed by the reconciler loop, which
    /// re-lists and resumes. It never leaves `Reconciler::run`.
    #[error("Resource version is gone: {0}")]
    Stale(String),

    /// The execution engine returned a manifest we cannot interpret.
    #[error("Malformed workflow manifest: {0}")]
    Malformed(String),

    #[error("Cycle detected among operators: {0:?}")]
    CyclicDependency(Vec<String>),

    #[error("Operator '{operator}' depends on unknown operator '{dependency}'")]
    UnknownDependency { operator: String, dependency: String },

    #[error("Operator '{0}' appears more than once")]
    DuplicateOperator(String),

    /// Non-success response from the execution engine or the cluster API.
    #[error("Engine error ({status}): {message}")]
    Engine { status: u16, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipewatchError {
    /// `true` for errors that mean "the thing is missing", as opposed to a
    /// failure talking to it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PipewatchError::NotFound(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipewatchError>;
