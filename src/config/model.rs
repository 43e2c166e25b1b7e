// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// url = "http://ml-pipeline.kubeflow:8888"
/// page_size = 10
///
/// [cluster]
/// api_url = "https://kubernetes.default.svc"
/// namespace = "anonymous"
/// ca_cert = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt"
/// token_file = "/var/run/secrets/kubernetes.io/serviceaccount/token"
///
/// [watch]
/// group = "machinelearning.seldon.io"
/// version = "v1alpha2"
/// plural = "seldondeployments"
///
/// [store]
/// database = "pipewatch.db"
///
/// [pipeline]
/// work_dir = "."
/// image = "platiagro/runner:latest"
/// ```
///
/// All sections are optional and have in-cluster defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub cluster: ClusterSection,
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (see
/// `validate.rs`) or [`ConfigFile::new_unchecked`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub engine: EngineSection,
    pub cluster: ClusterSection,
    pub watch: WatchSection,
    pub store: StoreSection,
    pub pipeline: PipelineSection,
}

impl ConfigFile {
    pub fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            engine: raw.engine,
            cluster: raw.cluster,
            watch: raw.watch,
            store: raw.store,
            pipeline: raw.pipeline,
        }
    }
}

/// `[engine]`: the pipelines API server.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Optional bearer token.
    #[serde(default)]
    pub token: Option<String>,

    /// How many runs `list_runs` returns at most.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_engine_url() -> String {
    "http://ml-pipeline.kubeflow:8888".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            token: None,
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// `[cluster]`: the orchestration system that emits deployment events.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSection {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub token: Option<String>,

    /// File holding the bearer token; read when `token` is unset.
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// PEM bundle trusted in addition to the system roots.
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,

    /// Namespace holding the deployment resources.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_api_url() -> String {
    "https://kubernetes.default.svc".to_string()
}

fn default_namespace() -> String {
    "anonymous".to_string()
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            token_file: None,
            ca_cert: None,
            namespace: default_namespace(),
        }
    }
}

/// `[watch]`: which custom resource collection the reconciler follows.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_plural")]
    pub plural: String,
}

fn default_group() -> String {
    "machinelearning.seldon.io".to_string()
}

fn default_version() -> String {
    "v1alpha2".to_string()
}

fn default_plural() -> String {
    "seldondeployments".to_string()
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            group: default_group(),
            version: default_version(),
            plural: default_plural(),
        }
    }
}

/// `[store]`: where deployment status is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from("pipewatch.db")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// `[pipeline]`: compiler settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Directory for compiled artifacts; they are removed after submission.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Container image that executes a task.
    #[serde(default = "default_image")]
    pub image: String,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_image() -> String {
    "platiagro/runner:latest".to_string()
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            image: default_image(),
        }
    }
}
