//! `cibuild-dry-run`: simulate one configured step without cluster access
//! and print the objects it would have created as JSON on stdout.

use anyhow::Context;
use cibuild_api::{ExecutionContext, ExecutionMode, JobSpec, StepConfiguration};
use cibuild_steps::steps::{self, StepClients, StepEnvironment};
use cibuild_steps::telemetry::{self, LogFormat};
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("cibuild-dry-run")
        .version(cibuild_steps::VERSION)
        .about("Simulate a build-graph step and print the objects it would create")
        .arg(
            Arg::new("config")
                .long("config")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Step configuration YAML"),
        )
        .arg(
            Arg::new("namespace")
                .long("namespace")
                .default_value("ci-op-dry-run")
                .help("Namespace the job would run in"),
        )
        .arg(
            Arg::new("artifact-dir")
                .long("artifact-dir")
                .value_parser(value_parser!(PathBuf))
                .help("Directory to capture simulated build requests in"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        );

    let matches = cli.get_matches();

    let format = if matches.get_flag("json-logs") {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    telemetry::init(format);

    let path = matches
        .get_one::<PathBuf>("config")
        .context("--config is required")?;
    let namespace = matches
        .get_one::<String>("namespace")
        .context("--namespace has a default")?;

    let config = StepConfiguration::from_path(path)?;
    config.validate()?;

    let mut env = StepEnvironment::new(JobSpec::new(namespace.as_str()));
    if let Some(dir) = matches.get_one::<PathBuf>("artifact-dir") {
        env = env.with_artifact_dir(dir.clone());
    }
    let step = steps::from_configuration(config, &StepClients::offline(), &env)?;

    tracing::info!("Simulating step {}: {}", step.name(), step.description());
    step.run(&ExecutionContext::new(), ExecutionMode::Simulated).await?;

    env.dry_logger
        .write_to(std::io::stdout().lock())
        .context("writing dry-run objects")?;
    Ok(())
}
