// src/pipeline/mod.rs

//! Pipeline definitions exchanged with the execution engine.
//!
//! - [`manifest`] models the workflow manifest the engine stores and returns.
//! - [`compiler`] turns an ordered operator graph into a submission artifact.

pub mod compiler;
pub mod manifest;

pub use compiler::{ArgoCompiler, CompileFuture, PipelineCompiler, PipelineContext};
pub use manifest::WorkflowManifest;
