// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod runs;
pub mod store;
pub mod types;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, RunsCommand};
use crate::config::{ConfigFile, default_config_path, load_and_validate, load_or_default};
use crate::dag::{Operator, build_template_tasks, order_operator_ids};
use crate::engine::KfpClient;
use crate::pipeline::ArgoCompiler;
use crate::runs::{RunController, StartRun};
use crate::store::SqliteStatusStore;
use crate::watch::{KubeWatchSource, Reconciler, ResourceRef};

/// High-level entry point used by `main.rs`.
///
/// Loads config, then dispatches the subcommand. Run commands print JSON
/// on stdout.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_or_default(default_config_path())?,
    };
    debug!(?cfg, "configuration loaded");

    match args.command {
        Command::Watch => run_watch(&cfg).await,
        Command::Order {
            operators,
            template,
        } => {
            let operators = read_operators(&operators)?;
            if template {
                print_json(&build_template_tasks(&operators)?)
            } else {
                print_json(&order_operator_ids(&operators)?)
            }
        }
        Command::Runs { command } => run_runs(&cfg, command).await,
        Command::Undeploy { deployment } => {
            controller(&cfg)?.undeploy(&deployment).await?;
            Ok(())
        }
    }
}

/// Run the reconciler until Ctrl-C.
async fn run_watch(cfg: &ConfigFile) -> Result<()> {
    let source = KubeWatchSource::new(&cfg.cluster)?;
    let store = SqliteStatusStore::open(&cfg.store.database)
        .with_context(|| format!("opening {}", cfg.store.database.display()))?;
    let resource = ResourceRef::from_config(&cfg.cluster, &cfg.watch);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    let reconciler = Reconciler::new(source.clone(), source, store, resource);
    let stats = reconciler.run(cancel).await?;
    info!(
        events = stats.events,
        updates = stats.updates,
        relists = stats.relists,
        "watch stopped"
    );
    Ok(())
}

async fn run_runs(cfg: &ConfigFile, command: RunsCommand) -> Result<()> {
    let controller = controller(cfg)?;

    match command {
        RunsCommand::List { context } => {
            print_json(&controller.list_runs(&context.to_context()).await?)
        }
        RunsCommand::Get { context, run_id } => {
            print_json(&controller.get_run(&run_id, &context.to_context()).await?)
        }
        RunsCommand::Start {
            context,
            project,
            operators,
            deployment_name,
        } => {
            let request = StartRun {
                project_id: project,
                context: context.to_context(),
                deployment_name,
                operators: read_operators(&operators)?,
            };
            print_json(&controller.start_run(request).await?)
        }
        RunsCommand::Retry { context, run_id } => {
            print_json(&controller.retry_run(&run_id, &context.to_context()).await?)
        }
        RunsCommand::Terminate { context, run_id } => {
            print_json(&controller.terminate_run(&run_id, &context.to_context()).await?)
        }
    }
}

fn controller(cfg: &ConfigFile) -> Result<RunController<KfpClient, ArgoCompiler>> {
    let engine = KfpClient::new(&cfg.engine)?;
    let compiler = ArgoCompiler::new(&cfg.pipeline.work_dir, &cfg.pipeline.image);
    Ok(RunController::new(engine, compiler, cfg.engine.page_size))
}

fn read_operators(path: &Path) -> Result<Vec<Operator>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading operators from {}", path.display()))?;
    let operators = serde_json::from_str(&raw)
        .with_context(|| format!("parsing operators in {}", path.display()))?;
    Ok(operators)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
