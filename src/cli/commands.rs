//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::Path;

use tracing::warn;

use crate::command;
use crate::config::{ConfigFile, Configuration, ConfigurationBuilder};
use crate::error::LaunchError;
use crate::execution::Cancellation;
use crate::project::ProjectModel;
use crate::runner::Runner;

use super::{CliError, CliResult, ExitCode, RunArgs};

// ============================================================================
// Configuration
// ============================================================================

/// Load the project model and build the configuration: file first, explicit flags on top.
fn prepare(project: &Path, config: Option<&Path>, args: &RunArgs) -> CliResult<Runner> {
    let model = ProjectModel::load(project).map_err(LaunchError::from)?;
    let configuration = configure(config, args).map_err(LaunchError::from)?;
    Ok(Runner::new(configuration, model))
}

fn configure(config: Option<&Path>, args: &RunArgs) -> Result<Configuration, crate::config::ConfigError> {
    let mut builder = ConfigurationBuilder::new();
    if let Some(path) = config {
        builder = builder.with_file(ConfigFile::load(path)?);
    }
    if let Some(timeout) = args.timeout {
        builder = builder.with_timeout(timeout);
    }
    if args.dry_run {
        builder = builder.with_dry_run(true);
    }
    if args.skip {
        builder = builder.with_skip(true);
    }
    if args.no_strict {
        builder = builder.with_strict(false);
    }
    if let Some(isolation) = &args.isolation {
        builder = builder.with_isolation(isolation.as_str());
    }
    if let Some(executor) = &args.executor {
        builder = builder.with_executor(executor.as_str());
    }
    if let Some(java) = &args.java {
        builder = builder.with_java_executable(java);
    }
    if let Some(reports) = &args.reports {
        builder = builder.with_reports(reports.as_str());
    }
    for tag in &args.tags {
        builder = builder.with_tag(tag.as_str());
    }
    for pattern in &args.class_name_patterns {
        builder = builder.with_class_name_pattern(pattern.as_str());
    }
    for (key, value) in &args.parameters {
        builder = builder.with_parameter(key.as_str(), value.as_str());
    }
    for (key, version) in &args.versions {
        builder = builder.with_version(key.as_str(), version.as_str());
    }

    let selectors = builder.selectors_mut();
    selectors.classes.extend(args.select_classes.iter().cloned());
    selectors.methods.extend(args.select_methods.iter().cloned());
    selectors.packages.extend(args.select_packages.iter().cloned());
    selectors.modules.extend(args.select_modules.iter().cloned());

    builder.build()
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            CliError::new(
                format!("Error starting async runtime: {e}"),
                ExitCode(junit_launch_core::codes::EXECUTION_FAILED),
            )
        })
}

// ============================================================================
// Commands
// ============================================================================

/// Run the whole pipeline; the exit code is the run's result code.
pub fn run_tests(project: &Path, config: Option<&Path>, args: &RunArgs) -> CliResult<ExitCode> {
    let (handle, cancellation) = Cancellation::new();
    let runner = prepare(project, config, args)?.with_cancellation(cancellation);

    let report = runtime()?.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping the run");
                handle.cancel();
            }
        });
        runner.run().await
    })?;

    println!("{}", junit_launch_core::codes::describe(report.code));
    if let Some(summary) = &report.summary {
        println!(
            "{} tests found: {} successful, {} failed, {} aborted, {} skipped",
            summary.tests_found,
            summary.tests_successful,
            summary.tests_failed,
            summary.tests_aborted,
            summary.tests_skipped
        );
    }
    Ok(ExitCode(report.code))
}

pub fn show_mode(project: &Path, config: Option<&Path>) -> CliResult<ExitCode> {
    let runner = prepare(project, config, &RunArgs::default())?;
    let world = runner.classify()?;
    println!("{world}");
    println!("barrier: {}", world.barrier());
    Ok(ExitCode::SUCCESS)
}

pub fn show_layers(project: &Path, config: Option<&Path>, args: &RunArgs) -> CliResult<ExitCode> {
    let runner = prepare(project, config, args)?;
    let layering = runner.layering()?;
    print!("{layering}");
    Ok(ExitCode::SUCCESS)
}

pub fn show_command(project: &Path, config: Option<&Path>, args: &RunArgs) -> CliResult<ExitCode> {
    let cmd = forked_command_line(project, config, args)?;
    println!("{}", command::describe(&cmd));
    Ok(ExitCode::SUCCESS)
}

/// The command line a `--dry-run --executor java` run would write.
fn forked_command_line(project: &Path, config: Option<&Path>, args: &RunArgs) -> CliResult<Vec<String>> {
    let args = RunArgs {
        executor: Some("java".to_string()),
        dry_run: true,
        ..args.clone()
    };
    let runner = prepare(project, config, &args)?;
    let world = runner.classify()?;
    let layering = runner.layering()?;
    Ok(runner.command_line(&world, &layering)?)
}
