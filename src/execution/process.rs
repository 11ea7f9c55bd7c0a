//! Forked console launcher.
//!
//! ## Termination
//!
//! A run that outlives its timeout (or is cancelled) is asked to stop, given [`TERMINATE_GRACE`] to comply, then
//! killed and given [`KILL_GRACE`] to be reaped. Either way the run reports [`codes::TIMEOUT`].

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use junit_launch_core::codes;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use super::Cancellation;
use crate::command;
use crate::config::Configuration;
use crate::project::ProjectModel;

pub const COMMAND_LOG: &str = "console-launcher.cmd.log";
pub const OUT_LOG: &str = "console-launcher.out.log";
pub const ERR_LOG: &str = "console-launcher.err.log";
/// Lines of each captured stream replayed into the log after the run.
pub const REPLAY_LIMIT: usize = 500;

/// Bounded wait for a process to exit: `polls` checks, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GracePeriod {
    pub polls: u32,
    pub interval: Duration,
}

impl GracePeriod {
    pub const fn new(polls: u32, interval: Duration) -> Self {
        Self { polls, interval }
    }

    pub fn total(&self) -> Duration {
        self.interval * self.polls
    }
}

pub const TERMINATE_GRACE: GracePeriod = GracePeriod::new(10, Duration::from_millis(123));
pub const KILL_GRACE: GracePeriod = GracePeriod::new(10, Duration::from_millis(1234));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The command line was written but not executed.
    DryRun,
    Completed(i32),
    /// The process outlived its timeout. `reaped` tells whether it was gone when we stopped waiting.
    TimedOut { reaped: bool },
    Failed(String),
}

impl ProcessOutcome {
    pub fn code(&self) -> i32 {
        match self {
            ProcessOutcome::DryRun => codes::SUCCESS,
            ProcessOutcome::Completed(code) => *code,
            ProcessOutcome::TimedOut { .. } => codes::TIMEOUT,
            ProcessOutcome::Failed(_) => codes::EXECUTION_FAILED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRun {
    pub outcome: ProcessOutcome,
    pub pid: Option<u32>,
    /// Captured standard output, when not inherited.
    pub stdout_log: Option<PathBuf>,
    pub stderr_log: Option<PathBuf>,
}

impl ProcessRun {
    pub fn code(&self) -> i32 {
        self.outcome.code()
    }

    fn without_process(outcome: ProcessOutcome) -> Self {
        Self {
            outcome,
            pid: None,
            stdout_log: None,
            stderr_log: None,
        }
    }
}

enum Wait {
    Exited(io::Result<ExitStatus>),
    Expired,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    timeout: Duration,
    dry_run: bool,
    inherit_io: bool,
    log_directory: Option<PathBuf>,
    working_directory: Option<PathBuf>,
    environment: BTreeMap<String, String>,
    terminate_grace: GracePeriod,
    kill_grace: GracePeriod,
    replay_limit: usize,
}

impl ProcessExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            dry_run: false,
            inherit_io: false,
            log_directory: None,
            working_directory: None,
            environment: BTreeMap::new(),
            terminate_grace: TERMINATE_GRACE,
            kill_grace: KILL_GRACE,
            replay_limit: REPLAY_LIMIT,
        }
    }

    /// Executor for the console launcher of a project: logs under the build directory, run from the base directory.
    pub fn for_project(configuration: &Configuration, project: &ProjectModel) -> Self {
        Self::new(configuration.timeout)
            .with_dry_run(configuration.dry_run)
            .with_inherit_io(configuration.java_options.inherit_io)
            .with_log_directory(&project.build_directory)
            .with_working_directory(&project.base_directory)
            .with_environment(configuration.java_options.additional_environment.clone())
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_inherit_io(mut self, inherit_io: bool) -> Self {
        self.inherit_io = inherit_io;
        self
    }

    pub fn with_log_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.log_directory = Some(directory.into());
        self
    }

    pub fn with_working_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(directory.into());
        self
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_grace(mut self, terminate: GracePeriod, kill: GracePeriod) -> Self {
        self.terminate_grace = terminate;
        self.kill_grace = kill;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `cmd` (program first) to completion, timeout or cancellation.
    ///
    /// ## Returns
    /// - A [`ProcessRun`] whose [`code`](ProcessRun::code) is the exit code of the process, [`codes::TIMEOUT`] when
    ///   it had to be stopped, or [`codes::EXECUTION_FAILED`] when it could not be started or awaited.
    ///
    /// ## Notes
    /// - Captured streams are truncated at the start of every run, then replayed through `tracing` at info/warn
    ///   level, or error level when the run failed.
    #[tracing::instrument(skip_all, fields(timeout = ?self.timeout))]
    pub async fn execute(&self, cmd: &[String], cancellation: &Cancellation) -> ProcessRun {
        let Some((program, arguments)) = cmd.split_first() else {
            error!("empty command line");
            return ProcessRun::without_process(ProcessOutcome::Failed("empty command line".to_string()));
        };

        let (stdout_log, stderr_log) = match self.prepare_logs(cmd) {
            Ok(logs) => logs,
            Err(err) => {
                error!(error = %err, "failed to prepare launcher logs");
                return ProcessRun::without_process(ProcessOutcome::Failed(err.to_string()));
            }
        };

        if self.dry_run {
            info!("dry run, not starting: {}", command::describe(cmd));
            return ProcessRun::without_process(ProcessOutcome::DryRun);
        }
        debug!("starting: {}", command::describe(cmd));

        let mut process = Command::new(program);
        process.args(arguments).envs(&self.environment).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(directory) = &self.working_directory {
            process.current_dir(directory);
        }
        if let Err(err) = self.redirect(&mut process, stdout_log.as_deref(), stderr_log.as_deref()) {
            error!(error = %err, "failed to open launcher logs");
            return ProcessRun::without_process(ProcessOutcome::Failed(err.to_string()));
        }

        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(program = %program, error = %err, "failed to start process");
                return ProcessRun::without_process(ProcessOutcome::Failed(format!("failed to start {program}: {err}")));
            }
        };
        let pid = child.id();
        debug!(pid, "process started");

        let wait = tokio::select! {
            waited = tokio::time::timeout(self.timeout, child.wait()) => match waited {
                Ok(status) => Wait::Exited(status),
                Err(_) => Wait::Expired,
            },
            () = cancellation.cancelled() => Wait::Cancelled,
        };

        let outcome = match wait {
            Wait::Exited(Ok(status)) => ProcessOutcome::Completed(exit_code(status)),
            Wait::Exited(Err(err)) => {
                error!(pid, error = %err, "failed waiting for process");
                ProcessOutcome::Failed(err.to_string())
            }
            Wait::Expired => {
                warn!(pid, timeout = ?self.timeout, "global timeout reached, terminating process");
                ProcessOutcome::TimedOut {
                    reaped: self.terminate(&mut child).await,
                }
            }
            Wait::Cancelled => {
                warn!(pid, "run cancelled, terminating process");
                ProcessOutcome::TimedOut {
                    reaped: self.terminate(&mut child).await,
                }
            }
        };

        let code = outcome.code();
        if let Some(path) = &stdout_log {
            self.replay(path, code, false);
        }
        if let Some(path) = &stderr_log {
            self.replay(path, code, true);
        }
        info!(pid, code, "{}", codes::describe(code));

        ProcessRun {
            outcome,
            pid,
            stdout_log,
            stderr_log,
        }
    }

    // --- helpers ---

    /// Write the command log and truncate the capture files.
    fn prepare_logs(&self, cmd: &[String]) -> io::Result<(Option<PathBuf>, Option<PathBuf>)> {
        let Some(directory) = &self.log_directory else {
            return Ok((None, None));
        };
        fs::create_dir_all(directory)?;
        fs::write(directory.join(COMMAND_LOG), cmd.join("\n"))?;
        if self.inherit_io {
            return Ok((None, None));
        }
        let stdout_log = directory.join(OUT_LOG);
        let stderr_log = directory.join(ERR_LOG);
        File::create(&stdout_log)?;
        File::create(&stderr_log)?;
        Ok((Some(stdout_log), Some(stderr_log)))
    }

    fn redirect(&self, process: &mut Command, stdout: Option<&Path>, stderr: Option<&Path>) -> io::Result<()> {
        if self.inherit_io {
            process.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            return Ok(());
        }
        match stdout {
            Some(path) => process.stdout(File::create(path)?),
            None => process.stdout(Stdio::null()),
        };
        match stderr {
            Some(path) => process.stderr(File::create(path)?),
            None => process.stderr(Stdio::null()),
        };
        Ok(())
    }

    /// Ask the process to stop, then kill it. Returns whether it was reaped.
    async fn terminate(&self, child: &mut Child) -> bool {
        request_termination(child);
        if wait_for_exit(child, self.terminate_grace).await {
            return true;
        }
        warn!(pid = child.id(), "process ignored termination request, killing it");
        if let Err(err) = child.start_kill() {
            warn!(error = %err, "failed to kill process");
        }
        let reaped = wait_for_exit(child, self.kill_grace).await;
        if !reaped {
            error!(pid = child.id(), "process survived being killed");
        }
        reaped
    }

    fn replay(&self, path: &Path, code: i32, stderr: bool) {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read launcher log");
                return;
            }
        };
        let lines: Vec<&str> = text.lines().collect();
        for line in lines.iter().take(self.replay_limit) {
            match (code == codes::SUCCESS, stderr) {
                (true, false) => info!(target: "junit_launch::console", "{line}"),
                (true, true) => warn!(target: "junit_launch::console", "{line}"),
                (false, _) => error!(target: "junit_launch::console", "{line}"),
            }
        }
        if lines.len() > self.replay_limit {
            info!(
                path = %path.display(),
                omitted = lines.len() - self.replay_limit,
                "launcher log truncated"
            );
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => {
            warn!(status = %status, "process terminated by a signal");
            codes::TESTS_FAILED
        }
    }
}

async fn wait_for_exit(child: &mut Child, grace: GracePeriod) -> bool {
    for _ in 0..grace.polls {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => tokio::time::sleep(grace.interval).await,
            Err(err) => {
                warn!(error = %err, "failed polling process");
                return false;
            }
        }
    }
    matches!(child.try_wait(), Ok(Some(_)))
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    let Some(pid) = child.id().and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; `pid` is our own child and has not been reaped yet.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        debug!(pid, error = %io::Error::last_os_error(), "SIGTERM not delivered");
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        debug!(error = %err, "termination request not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_codes() {
        assert_eq!(ProcessOutcome::DryRun.code(), 0);
        assert_eq!(ProcessOutcome::Completed(1).code(), 1);
        assert_eq!(ProcessOutcome::TimedOut { reaped: true }.code(), -2);
        assert_eq!(ProcessOutcome::Failed("x".into()).code(), -1);
    }

    #[test]
    fn grace_totals() {
        assert_eq!(TERMINATE_GRACE.total(), Duration::from_millis(1230));
        assert_eq!(KILL_GRACE.total(), Duration::from_millis(12340));
    }

    #[tokio::test]
    async fn empty_command_fails() {
        let run = ProcessExecutor::new(Duration::from_secs(1)).execute(&[], &Cancellation::never()).await;
        assert_eq!(run.code(), codes::EXECUTION_FAILED);
    }
}
