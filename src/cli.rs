// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::RunContext;

/// Command-line arguments for `pipewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipewatch",
    version,
    about = "Reconcile deployment status and manage pipeline runs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$PIPEWATCH_CONFIG`, else `Pipewatch.toml` in the current
    /// working directory. A missing default file means built-in defaults.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEWATCH_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Watch deployment resources and persist their status until Ctrl-C.
    Watch,

    /// Print operators from a JSON file in dependency order.
    Order {
        /// JSON array of operators.
        #[arg(value_name = "FILE")]
        operators: PathBuf,

        /// Print full template tasks instead of bare ids.
        #[arg(long)]
        template: bool,
    },

    /// Manage pipeline runs of an experiment or deployment.
    Runs {
        #[command(subcommand)]
        command: RunsCommand,
    },

    /// Terminate the latest run of a deployment that is being removed.
    Undeploy {
        #[arg(value_name = "DEPLOYMENT_ID")]
        deployment: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum RunsCommand {
    /// List the newest runs.
    List {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Show one run.
    Get {
        #[command(flatten)]
        context: ContextArgs,
        /// Run id, or `latest`.
        #[arg(default_value = "latest")]
        run_id: String,
    },

    /// Compile and submit a new run.
    Start {
        #[command(flatten)]
        context: ContextArgs,
        #[arg(long, value_name = "ID")]
        project: String,
        /// JSON array of operators.
        #[arg(long, value_name = "FILE")]
        operators: PathBuf,
        /// Display name passed to deployment containers.
        #[arg(long, value_name = "NAME")]
        deployment_name: Option<String>,
    },

    /// Retry a failed run.
    Retry {
        #[command(flatten)]
        context: ContextArgs,
        #[arg(default_value = "latest")]
        run_id: String,
    },

    /// Request termination of a run.
    Terminate {
        #[command(flatten)]
        context: ContextArgs,
        #[arg(default_value = "latest")]
        run_id: String,
    },
}

/// Experiment or deployment a run command applies to. Exactly one is
/// required.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct ContextArgs {
    #[arg(long, value_name = "ID")]
    pub experiment: Option<String>,
    #[arg(long, value_name = "ID")]
    pub deployment: Option<String>,
}

impl ContextArgs {
    pub fn to_context(&self) -> RunContext {
        match (&self.experiment, &self.deployment) {
            (Some(id), _) => RunContext::Experiment(id.clone()),
            (None, Some(id)) => RunContext::Deployment(id.clone()),
            (None, None) => RunContext::Experiment(String::new()),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_flags_are_mutually_exclusive() {
        let err = CliArgs::try_parse_from([
            "pipewatch", "runs", "list", "--experiment", "e1", "--deployment", "d1",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn run_id_defaults_to_latest() {
        let args =
            CliArgs::try_parse_from(["pipewatch", "runs", "retry", "--deployment", "d1"]).unwrap();
        match args.command {
            Command::Runs {
                command: RunsCommand::Retry { context, run_id },
            } => {
                assert_eq!(run_id, "latest");
                assert_eq!(context.to_context(), RunContext::Deployment("d1".into()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "pipewatch", "watch", "--config", "x.toml", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
