//! An engine host that drives the console launcher in a child JVM.
//!
//! Used by the in-process launcher when no embedded platform is available: the top loader tier becomes the class
//! path of the child, and the console's summary table is read back into counters. The child has no module layer, so a
//! module selection becomes a scan of the test output directory.

use std::fs;
use std::path::PathBuf;

use tokio::runtime::Handle;
use tracing::debug;

use super::Cancellation;
use super::direct::{HostError, LaunchRequest, TestEngineHost, TestExecutionListener, TestExecutionSummary, TestPlan};
use super::process::{ProcessExecutor, ProcessOutcome};
use crate::command::{CONSOLE_LAUNCHER_CLASS, Selection, join_paths};
use crate::config::Configuration;
use crate::project::ProjectModel;

pub struct ConsoleEngineHost {
    java: PathBuf,
    java_options: Vec<String>,
    test_root: Option<PathBuf>,
    executor: ProcessExecutor,
}

impl ConsoleEngineHost {
    pub fn new(java: impl Into<PathBuf>, executor: ProcessExecutor) -> Self {
        Self {
            java: java.into(),
            java_options: Vec::new(),
            test_root: None,
            executor,
        }
    }

    pub fn for_project(configuration: &Configuration, project: &ProjectModel) -> Self {
        let options = &configuration.java_options;
        let mut java_options = options.additional_options.clone();
        java_options.push(format!("-Dfile.encoding={}", options.encoding));
        Self {
            java: configuration.java_executable(),
            java_options,
            test_root: Some(project.test_output_directory.clone()),
            executor: ProcessExecutor::for_project(configuration, project).with_inherit_io(false).with_dry_run(false),
        }
    }

    fn command_line(&self, request: &LaunchRequest) -> Vec<String> {
        let top = request.chain.tiers.len().saturating_sub(1);
        let mut cmd = vec![self.java.display().to_string()];
        cmd.extend(self.java_options.iter().cloned());
        cmd.push("-classpath".to_string());
        cmd.push(join_paths(request.chain.visible_paths(top)));
        cmd.push(CONSOLE_LAUNCHER_CLASS.to_string());

        let mut options = request.options.clone();
        if let Selection::Module(module) = &options.selection {
            debug!(module = %module, "no module layer on the class path, scanning the test output instead");
            options.selection = Selection::ClassPathRoots(self.test_root.iter().cloned().collect());
        }
        cmd.extend(options.to_arguments());
        cmd
    }
}

impl TestEngineHost for ConsoleEngineHost {
    fn discover(&self, _request: &LaunchRequest) -> Result<TestPlan, HostError> {
        Ok(TestPlan::deferred())
    }

    fn execute(
        &self,
        request: &LaunchRequest,
        _plan: &TestPlan,
        listener: &mut dyn TestExecutionListener,
        cancellation: &Cancellation,
    ) -> Result<(), HostError> {
        let cmd = self.command_line(request);
        let run = Handle::current().block_on(self.executor.execute(&cmd, cancellation));

        let counts = match &run.stdout_log {
            Some(path) => parse_summary(&fs::read_to_string(path)?),
            None => None,
        };
        if let Some(counts) = &counts {
            listener.on_counts(counts);
        }

        match run.outcome {
            ProcessOutcome::Completed(code) => match counts {
                Some(counts) if code == counts.code() => Ok(()),
                _ if code == 0 => Ok(()),
                _ => Err(HostError::Exit(code)),
            },
            ProcessOutcome::TimedOut { .. } => {
                debug!("console host stopped by cancellation");
                Ok(())
            }
            ProcessOutcome::Failed(message) => Err(HostError::Execution(message)),
            ProcessOutcome::DryRun => Ok(()),
        }
    }
}

/// Read the console launcher's summary table (`[ 5 tests successful ]`).
pub fn parse_summary(output: &str) -> Option<TestExecutionSummary> {
    let mut summary = TestExecutionSummary::default();
    let mut seen = false;
    for line in output.lines() {
        let Some(inner) = line.trim().strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) else {
            continue;
        };
        let words: Vec<&str> = inner.split_whitespace().collect();
        let [count, kind, outcome] = words.as_slice() else {
            continue;
        };
        let Ok(count) = count.parse::<u64>() else {
            continue;
        };
        let counter = match (*kind, *outcome) {
            ("containers", "found") => &mut summary.containers_found,
            ("containers", "started") => &mut summary.containers_started,
            ("containers", "successful") => &mut summary.containers_successful,
            ("containers", "failed") => &mut summary.containers_failed,
            ("containers", "aborted") => &mut summary.containers_aborted,
            ("containers", "skipped") => &mut summary.containers_skipped,
            ("tests", "found") => &mut summary.tests_found,
            ("tests", "started") => &mut summary.tests_started,
            ("tests", "successful") => &mut summary.tests_successful,
            ("tests", "failed") => &mut summary.tests_failed,
            ("tests", "aborted") => &mut summary.tests_aborted,
            ("tests", "skipped") => &mut summary.tests_skipped,
            _ => continue,
        };
        *counter = count;
        seen = true;
    }
    seen.then_some(summary)
}
