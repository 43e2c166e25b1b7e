// src/engine/kfp.rs

//! Kubeflow Pipelines (v1beta1 REST API) implementation of [`PipelineEngine`].

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::EngineSection;
use crate::engine::backend::{EngineFuture, PipelineEngine};
use crate::engine::{EngineExperiment, EngineRun, RunDetail};
use crate::errors::{PipewatchError, Result};

const API_PREFIX: &str = "apis/v1beta1";

/// HTTP client for the pipelines API server.
#[derive(Debug, Clone)]
pub struct KfpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListExperimentsResponse {
    #[serde(default)]
    experiments: Vec<EngineExperiment>,
}

#[derive(Debug, Default, Deserialize)]
struct ListRunsResponse {
    #[serde(default)]
    runs: Vec<EngineRun>,
}

#[derive(Debug, Deserialize)]
struct RunDetailResponse {
    run: EngineRun,
    #[serde(default)]
    pipeline_runtime: Option<PipelineRuntime>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineRuntime {
    #[serde(default)]
    workflow_manifest: String,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    name: &'a str,
    pipeline_spec: PipelineSpec,
    resource_references: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct PipelineSpec {
    workflow_manifest: String,
}

impl KfpClient {
    /// Build a client from the `[engine]` config section.
    pub fn new(config: &EngineSection) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}", self.base_url)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = self.authorized(req).send().await?;
        check_status(response).await
    }
}

/// Map non-success responses onto the error taxonomy.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(PipewatchError::NotFound(body));
    }
    Err(PipewatchError::Engine {
        status: status.as_u16(),
        message: body,
    })
}

fn detail_from(response: RunDetailResponse) -> RunDetail {
    RunDetail {
        run: response.run,
        workflow_manifest: response
            .pipeline_runtime
            .map(|rt| rt.workflow_manifest)
            .unwrap_or_default(),
    }
}

impl PipelineEngine for KfpClient {
    fn get_experiment<'a>(&'a self, name: &'a str) -> EngineFuture<'a, EngineExperiment> {
        Box::pin(async move {
            let filter = json!({
                "predicates": [{"key": "name", "op": "EQUALS", "string_value": name}]
            })
            .to_string();

            let req = self
                .client
                .get(self.url("experiments"))
                .query(&[("filter", filter.as_str()), ("page_size", "1")]);
            let list: ListExperimentsResponse = self.send(req).await?.json().await?;

            list.experiments
                .into_iter()
                .find(|e| e.name == name)
                .ok_or_else(|| PipewatchError::NotFound(format!("experiment '{name}' does not exist")))
        })
    }

    fn create_experiment<'a>(&'a self, name: &'a str) -> EngineFuture<'a, EngineExperiment> {
        Box::pin(async move {
            let req = self
                .client
                .post(self.url("experiments"))
                .json(&json!({ "name": name }));
            let experiment: EngineExperiment = self.send(req).await?.json().await?;
            debug!(experiment = %name, id = %experiment.id, "created engine experiment");
            Ok(experiment)
        })
    }

    fn list_runs<'a>(
        &'a self,
        experiment_id: &'a str,
        page_size: u32,
        sort_by: &'a str,
    ) -> EngineFuture<'a, Vec<EngineRun>> {
        Box::pin(async move {
            let page_size = page_size.to_string();
            let req = self.client.get(self.url("runs")).query(&[
                ("resource_reference_key.type", "EXPERIMENT"),
                ("resource_reference_key.id", experiment_id),
                ("page_size", page_size.as_str()),
                ("sort_by", sort_by),
            ]);
            let list: ListRunsResponse = self.send(req).await?.json().await?;
            Ok(list.runs)
        })
    }

    fn run_pipeline<'a>(
        &'a self,
        experiment_id: &'a str,
        job_name: &'a str,
        artifact: &'a Path,
    ) -> EngineFuture<'a, EngineRun> {
        Box::pin(async move {
            let workflow_manifest = tokio::fs::read_to_string(artifact).await?;
            let body = CreateRunRequest {
                name: job_name,
                pipeline_spec: PipelineSpec { workflow_manifest },
                resource_references: vec![json!({
                    "key": {"type": "EXPERIMENT", "id": experiment_id},
                    "relationship": "OWNER",
                })],
            };

            let req = self.client.post(self.url("runs")).json(&body);
            let created: RunDetailResponse = self.send(req).await?.json().await?;
            Ok(created.run)
        })
    }

    fn get_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, RunDetail> {
        Box::pin(async move {
            let req = self.client.get(self.url(&format!("runs/{run_id}")));
            let detail: RunDetailResponse = self.send(req).await?.json().await?;
            Ok(detail_from(detail))
        })
    }

    fn terminate_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            let req = self.client.post(self.url(&format!("runs/{run_id}/terminate")));
            self.send(req).await?;
            Ok(())
        })
    }

    fn retry_run<'a>(&'a self, run_id: &'a str) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            let req = self.client.post(self.url(&format!("runs/{run_id}/retry")));
            self.send(req).await?;
            Ok(())
        })
    }
}
