//! CLI module for junit-launch
//!
//! ## Commands
//!
//! - `run` - Classify, layer, and execute the tests
//! - `mode` - Print the classified modules and the resulting test mode
//! - `layers` - Print the path layering
//! - `command` - Print the forked JVM command line without running it
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use junit_launch_core::codes;

use crate::error::{ErrorCategory, LaunchError};
use crate::project::DEFAULT_PROJECT_FILE;
use crate::version::JUNIT_LAUNCH_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(codes::SUCCESS);
    pub const FAILURE: ExitCode = ExitCode(codes::TESTS_FAILED);
    /// The project layout or the configuration must be fixed.
    pub const CONFIGURATION: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<LaunchError> for CliError {
    /// Render the full diagnostic chain; the exit code follows the error category.
    fn from(err: LaunchError) -> Self {
        let exit_code = match err.category() {
            ErrorCategory::Configuration | ErrorCategory::Resolution => ExitCode::CONFIGURATION,
            ErrorCategory::NoTests => ExitCode::FAILURE,
            ErrorCategory::Execution => ExitCode(codes::EXECUTION_FAILED),
        };
        Self::new(format!("{:?}", miette::Report::new(err)), exit_code)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Launch the JUnit Platform for a classic or modular Java project
#[derive(Parser, Debug)]
#[command(name = "junit-launch")]
#[command(version = JUNIT_LAUNCH_VERSION)]
#[command(about = "Launch the JUnit Platform for a classic or modular Java project", long_about = None)]
pub struct Cli {
    /// Project model exported by the build
    #[arg(long, global = true, value_name = "FILE", default_value = DEFAULT_PROJECT_FILE)]
    pub project: PathBuf,

    /// JSON configuration file, overridden by explicit flags
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log pipeline decisions (default filter `debug` instead of `info`; `RUST_LOG` still wins)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify, layer, and execute the tests
    Run(RunArgs),

    /// Print the classified modules and the resulting test mode
    Mode,

    /// Print the path layering
    Layers(RunArgs),

    /// Print the forked JVM command line without running it
    Command(RunArgs),
}

/// Flags shared by every command that builds a configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Global timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Write the command log but do not start the run
    #[arg(long)]
    pub dry_run: bool,

    /// Skip test execution entirely
    #[arg(long)]
    pub skip: bool,

    /// Do not fail a run that discovers no tests
    #[arg(long)]
    pub no_strict: bool,

    /// Isolation level: absolute, almost, merged, none
    #[arg(long, value_name = "LEVEL")]
    pub isolation: Option<String>,

    /// Executor: direct (in-process) or java (forked)
    #[arg(long, value_name = "KIND")]
    pub executor: Option<String>,

    /// Java executable of the forked JVM
    #[arg(long, value_name = "PATH")]
    pub java: Option<PathBuf>,

    /// Reports directory, relative to the build directory; empty disables reports
    #[arg(long, value_name = "DIR")]
    pub reports: Option<String>,

    /// Include tests tagged with TAG
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Include classes whose fully qualified name matches PATTERN
    #[arg(long = "include-classname", value_name = "PATTERN")]
    pub class_name_patterns: Vec<String>,

    /// Configuration parameter passed to the platform
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub parameters: Vec<(String, String)>,

    /// Version override, e.g. junit.jupiter.version=5.3.1
    #[arg(long = "with-version", value_name = "KEY=VERSION", value_parser = parse_key_value)]
    pub versions: Vec<(String, String)>,

    /// Select a class
    #[arg(long = "select-class", value_name = "CLASS")]
    pub select_classes: Vec<String>,

    /// Select a method (`class#method`)
    #[arg(long = "select-method", value_name = "METHOD")]
    pub select_methods: Vec<String>,

    /// Select a package
    #[arg(long = "select-package", value_name = "PACKAGE")]
    pub select_packages: Vec<String>,

    /// Select a module
    #[arg(long = "select-module", value_name = "MODULE")]
    pub select_modules: Vec<String>,
}

fn parse_key_value(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{input}`")),
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Initialize structured logging with env-based filter, defaulting to `info` (`debug` when verbose).
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .try_init();
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Run(args) => commands::run_tests(&cli.project, config, &args),
        Command::Mode => commands::show_mode(&cli.project, config),
        Command::Layers(args) => commands::show_layers(&cli.project, config, &args),
        Command::Command(args) => commands::show_command(&cli.project, config, &args),
    }
}

// ============================================================================
// Tests
// ============================================================================
