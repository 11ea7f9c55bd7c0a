//! In-process execution through a pluggable engine host.
//!
//! ## Host seam
//!
//! The platform itself lives behind [`TestEngineHost`]: discovery returns a [`TestPlan`], execution reports events
//! to a [`TestExecutionListener`]. [`InProcessLauncher`] runs both on a blocking worker thread and bounds the whole
//! launch with the configured timeout.
//!
//! ## Loader chain
//!
//! A [`LoaderChain`] lists the path tiers a host must isolate, parent first: `main`, `test`, `launcher`, and
//! `isolator` on top when worker isolation is required. Each tier sees its own paths and those of its ancestors.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use junit_launch_core::{LayerName, codes};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::Cancellation;
use super::report::SummaryListener;
use crate::command::{ConsoleOptions, Selection};
use crate::config::{Configuration, Tweaks};
use crate::layering::PathLayering;
use crate::project::ProjectModel;
use crate::world::ModularWorld;

/// Failure reported by a [`TestEngineHost`].
#[derive(Debug, Error, Diagnostic)]
pub enum HostError {
    #[error("test discovery failed: {0}")]
    #[diagnostic(code(junit_launch::host::discovery))]
    Discovery(String),

    #[error("test execution failed: {0}")]
    #[diagnostic(code(junit_launch::host::execution))]
    Execution(String),

    #[error("engine host exited with code {0}")]
    #[diagnostic(code(junit_launch::host::exit))]
    Exit(i32),

    #[error("engine host I/O error: {0}")]
    #[diagnostic(code(junit_launch::host::io))]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, Diagnostic)]
pub enum LauncherError {
    /// Passed through unchanged.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Host(#[from] HostError),

    #[error("zero tests discovered")]
    #[diagnostic(
        code(junit_launch::launcher::no_tests),
        help("check the selectors and filters, or run with --no-strict to allow an empty run")
    )]
    NoTests,

    #[error("the in-process worker was cancelled before it finished")]
    #[diagnostic(code(junit_launch::launcher::aborted))]
    Aborted,
}

// ============================================================================
// Request
// ============================================================================

/// Root of a loader chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoaderRoot {
    Platform,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderTier {
    pub name: String,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderChain {
    pub root: LoaderRoot,
    pub tiers: Vec<LoaderTier>,
}

impl LoaderChain {
    /// Stack the layers parent first. Without worker isolation the `isolator` paths join the tier below them.
    pub fn from_layering(layering: &PathLayering, tweaks: &Tweaks) -> Self {
        let root = if tweaks.platform_class_loader {
            LoaderRoot::Platform
        } else {
            LoaderRoot::System
        };
        let mut tiers: Vec<LoaderTier> = Vec::new();
        for (name, paths) in layering.iter() {
            let paths: Vec<PathBuf> = paths.iter().cloned().collect();
            if name == LayerName::Isolator && !tweaks.worker_isolation_required {
                match tiers.last_mut() {
                    Some(below) => below.paths.extend(paths),
                    None => tiers.push(LoaderTier {
                        name: name.as_str().to_string(),
                        paths,
                    }),
                }
                continue;
            }
            tiers.push(LoaderTier {
                name: name.as_str().to_string(),
                paths,
            });
        }
        Self { root, tiers }
    }

    /// Paths visible from tier `index`: its own and every ancestor's, parent first.
    pub fn visible_paths(&self, index: usize) -> Vec<&PathBuf> {
        self.tiers
            .iter()
            .take(index.saturating_add(1))
            .flat_map(|tier| tier.paths.iter())
            .collect()
    }

    /// The tier the platform is started from.
    pub fn top(&self) -> Option<&LoaderTier> {
        self.tiers.last()
    }
}

/// Everything an engine host needs to discover and run the tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub chain: LoaderChain,
    pub options: ConsoleOptions,
}

impl LaunchRequest {
    /// A class path scan is rooted at the test output directory.
    pub fn new(
        world: &ModularWorld,
        layering: &PathLayering,
        configuration: &Configuration,
        project: &ProjectModel,
    ) -> Self {
        let mut options = ConsoleOptions::new(configuration, project, world);
        if let Selection::ClassPathRoots(roots) = &mut options.selection {
            if roots.is_empty() {
                roots.push(project.test_output_directory.clone());
            }
        }
        Self {
            chain: LoaderChain::from_layering(layering, &configuration.tweaks),
            options,
        }
    }
}

// ============================================================================
// Plan and events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestIdentifier {
    pub unique_id: String,
    pub display_name: String,
    pub container: bool,
}

impl TestIdentifier {
    pub fn test(unique_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            unique_id: unique_id.into(),
            display_name: display_name.into(),
            container: false,
        }
    }

    pub fn container(unique_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            container: true,
            ..Self::test(unique_id, display_name)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPlan {
    /// Engines first, then their containers and tests.
    pub identifiers: Vec<TestIdentifier>,
    /// `None` when the host only learns the count while executing.
    pub test_count: Option<usize>,
}

impl TestPlan {
    pub fn new(identifiers: Vec<TestIdentifier>) -> Self {
        let test_count = identifiers.iter().filter(|id| !id.container).count();
        Self {
            identifiers,
            test_count: Some(test_count),
        }
    }

    /// A plan whose size is unknown until execution.
    pub fn deferred() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Successful,
    Aborted(String),
    Failed(String),
    Skipped(String),
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecutionSummary {
    pub containers_found: u64,
    pub containers_started: u64,
    pub containers_successful: u64,
    pub containers_failed: u64,
    pub containers_aborted: u64,
    pub containers_skipped: u64,
    pub tests_found: u64,
    pub tests_started: u64,
    pub tests_successful: u64,
    pub tests_failed: u64,
    pub tests_aborted: u64,
    pub tests_skipped: u64,
    #[serde(skip)]
    pub duration: Duration,
}

impl TestExecutionSummary {
    pub fn is_success(&self) -> bool {
        self.tests_failed == 0 && self.containers_failed == 0
    }

    pub fn code(&self) -> i32 {
        if self.is_success() {
            codes::SUCCESS
        } else {
            codes::TESTS_FAILED
        }
    }
}

/// Receives the events of one launch, on the worker thread.
pub trait TestExecutionListener: Send {
    fn on_plan(&mut self, _plan: &TestPlan) {}

    fn on_started(&mut self, _test: &TestIdentifier) {}

    fn on_finished(&mut self, test: &TestIdentifier, status: &TestStatus, duration: Duration);

    /// Counters reported wholesale by hosts that cannot report single events.
    fn on_counts(&mut self, _counts: &TestExecutionSummary) {}

    fn on_complete(&mut self, _summary: &TestExecutionSummary) {}
}

/// Runs a test platform against a [`LaunchRequest`].
pub trait TestEngineHost: Send + Sync {
    fn discover(&self, request: &LaunchRequest) -> Result<TestPlan, HostError>;

    /// Execute a discovered plan. Long-running hosts should poll `cancellation` and return early once it is raised.
    fn execute(
        &self,
        request: &LaunchRequest,
        plan: &TestPlan,
        listener: &mut dyn TestExecutionListener,
        cancellation: &Cancellation,
    ) -> Result<(), HostError>;
}

// ============================================================================
// Launcher
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Completed(TestExecutionSummary),
    TimedOut,
}

impl LaunchOutcome {
    pub fn code(&self) -> i32 {
        match self {
            LaunchOutcome::Completed(summary) => summary.code(),
            LaunchOutcome::TimedOut => codes::TIMEOUT,
        }
    }
}

pub struct InProcessLauncher {
    host: Arc<dyn TestEngineHost>,
    timeout: Duration,
    grace: Duration,
    stop: Cancellation,
}

impl InProcessLauncher {
    pub fn new(host: Arc<dyn TestEngineHost>, timeout: Duration) -> Self {
        Self {
            host,
            timeout,
            grace: super::process::TERMINATE_GRACE.total(),
            stop: Cancellation::never(),
        }
    }

    /// Stop the run early, as if the timeout had been reached.
    pub fn with_cancellation(mut self, stop: Cancellation) -> Self {
        self.stop = stop;
        self
    }

    /// How long a cancelled worker is awaited before it is abandoned.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Discover and execute on a worker thread, bounded by the timeout.
    ///
    /// ## Returns
    /// - [`LaunchOutcome::Completed`] with the counters of the run, or [`LaunchOutcome::TimedOut`].
    ///
    /// ## Errors
    /// - [`LauncherError::Host`] carrying the host's own error, unchanged.
    /// - [`LauncherError::NoTests`] when a run that must find tests discovers none.
    ///
    /// ## Notes
    /// - A panic on the worker thread resumes on the caller with its original payload.
    #[tracing::instrument(skip_all, fields(timeout = ?self.timeout))]
    pub async fn launch(
        &self,
        request: LaunchRequest,
        listeners: Vec<Box<dyn TestExecutionListener>>,
    ) -> Result<LaunchOutcome, LauncherError> {
        let (handle, cancellation) = Cancellation::new();
        let host = Arc::clone(&self.host);
        let mut worker = tokio::task::spawn_blocking(move || run(host.as_ref(), &request, listeners, &cancellation));

        let reason = tokio::select! {
            joined = tokio::time::timeout(self.timeout, &mut worker) => match joined {
                Ok(Ok(result)) => return result.map(LaunchOutcome::Completed),
                Ok(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Ok(Err(_)) => return Err(LauncherError::Aborted),
                Err(_) => "global timeout reached",
            },
            () = self.stop.cancelled() => "run cancelled",
        };

        warn!(timeout = ?self.timeout, "{reason}, cancelling in-process run");
        handle.cancel();
        match tokio::time::timeout(self.grace, &mut worker).await {
            Ok(_) => debug!("worker stopped after cancellation"),
            Err(_) => warn!("worker ignored cancellation, abandoning it"),
        }
        Ok(LaunchOutcome::TimedOut)
    }
}

fn run(
    host: &dyn TestEngineHost,
    request: &LaunchRequest,
    listeners: Vec<Box<dyn TestExecutionListener>>,
    cancellation: &Cancellation,
) -> Result<TestExecutionSummary, LauncherError> {
    info!("launching test platform in-process");
    let plan = host.discover(request)?;
    if plan.test_count == Some(0) {
        if request.options.fail_if_no_tests {
            return Err(LauncherError::NoTests);
        }
        warn!("zero tests discovered");
    }

    let mut broadcast = Broadcast {
        summary: SummaryListener::default(),
        listeners,
    };
    broadcast.on_plan(&plan);
    host.execute(request, &plan, &mut broadcast, cancellation)?;

    let summary = broadcast.summary.summary();
    for listener in &mut broadcast.listeners {
        listener.on_complete(&summary);
    }
    info!(
        tests = summary.tests_found,
        successful = summary.tests_successful,
        failed = summary.tests_failed,
        "in-process run finished"
    );
    Ok(summary)
}

/// Fans events out to the summary and every registered listener.
struct Broadcast {
    summary: SummaryListener,
    listeners: Vec<Box<dyn TestExecutionListener>>,
}

impl TestExecutionListener for Broadcast {
    fn on_plan(&mut self, plan: &TestPlan) {
        self.summary.on_plan(plan);
        self.listeners.iter_mut().for_each(|l| l.on_plan(plan));
    }

    fn on_started(&mut self, test: &TestIdentifier) {
        self.summary.on_started(test);
        self.listeners.iter_mut().for_each(|l| l.on_started(test));
    }

    fn on_finished(&mut self, test: &TestIdentifier, status: &TestStatus, duration: Duration) {
        self.summary.on_finished(test, status, duration);
        self.listeners.iter_mut().for_each(|l| l.on_finished(test, status, duration));
    }

    fn on_counts(&mut self, counts: &TestExecutionSummary) {
        self.summary.on_counts(counts);
        self.listeners.iter_mut().for_each(|l| l.on_counts(counts));
    }
}
