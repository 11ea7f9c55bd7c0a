//! Top-level error of a launch.
//!
//! Every stage keeps its own error type; [`LaunchError`] only aggregates them so the CLI can render one diagnostic
//! and pick an exit code from [`LaunchError::category`].

use junit_launch_modules::ClassifyError;
use miette::Diagnostic;
use thiserror::Error;

use crate::command::CommandError;
use crate::config::ConfigError;
use crate::execution::LauncherError;
use crate::layering::LayeringError;
use crate::project::ProjectError;
use crate::resolver::ResolutionError;

#[derive(Debug, Error, Diagnostic)]
pub enum LaunchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Layering(#[from] LayeringError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Launcher(#[from] LauncherError),
}

/// How a failed launch should be treated by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The project layout or the configuration must be fixed; retrying cannot help.
    Configuration,
    /// A runtime component could not be resolved.
    Resolution,
    /// The run started but could not produce a result.
    Execution,
    /// The run completed without the tests it was required to find.
    NoTests,
}

impl LaunchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LaunchError::Classify(ClassifyError::AmbiguousModule { .. }) => ErrorCategory::Configuration,
            LaunchError::Classify(ClassifyError::Io { .. }) => ErrorCategory::Execution,
            LaunchError::Config(_) | LaunchError::Project(_) => ErrorCategory::Configuration,
            LaunchError::Command(CommandError::MissingModuleName { .. }) => ErrorCategory::Configuration,
            LaunchError::Command(CommandError::PatchConfiguration { .. }) => ErrorCategory::Configuration,
            LaunchError::Resolution(_) | LaunchError::Layering(_) => ErrorCategory::Resolution,
            LaunchError::Launcher(LauncherError::NoTests) => ErrorCategory::NoTests,
            LaunchError::Launcher(_) => ErrorCategory::Execution,
        }
    }
}
