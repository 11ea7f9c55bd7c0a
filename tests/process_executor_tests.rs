//! Forked process supervision: exit codes, captured logs, dry runs and the timeout escalation.
#![cfg(unix)]

use std::fs;
use std::time::{Duration, Instant};

use junit_launch::codes;
use junit_launch::execution::process::{COMMAND_LOG, ERR_LOG, OUT_LOG};
use junit_launch::execution::{Cancellation, GracePeriod, ProcessExecutor, ProcessOutcome};

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

fn process_exists(pid: u32) -> bool {
    // SAFETY: signal 0 only checks that the process exists.
    #[allow(unsafe_code)]
    let rc = unsafe { libc::kill(pid as libc::pid_t, 0) };
    rc == 0
}

#[tokio::test]
async fn exit_code_is_reported_and_streams_are_captured() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ProcessExecutor::new(Duration::from_secs(10)).with_log_directory(dir.path());

    let run = executor.execute(&sh("echo out; echo err >&2; exit 3"), &Cancellation::never()).await;

    assert_eq!(run.outcome, ProcessOutcome::Completed(3));
    assert_eq!(run.code(), 3);
    assert_eq!(fs::read_to_string(dir.path().join(OUT_LOG)).unwrap(), "out\n");
    assert_eq!(fs::read_to_string(dir.path().join(ERR_LOG)).unwrap(), "err\n");
    assert_eq!(
        fs::read_to_string(dir.path().join(COMMAND_LOG)).unwrap(),
        "sh\n-c\necho out; echo err >&2; exit 3"
    );
}

#[tokio::test]
async fn logs_are_truncated_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ProcessExecutor::new(Duration::from_secs(10)).with_log_directory(dir.path());

    executor.execute(&sh("echo first"), &Cancellation::never()).await;
    let run = executor.execute(&sh("true"), &Cancellation::never()).await;

    assert_eq!(run.code(), codes::SUCCESS);
    assert_eq!(fs::read_to_string(dir.path().join(OUT_LOG)).unwrap(), "");
}

#[tokio::test]
async fn dry_run_writes_the_command_log_only() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let executor = ProcessExecutor::new(Duration::from_secs(10))
        .with_log_directory(dir.path())
        .with_dry_run(true);

    let run = executor
        .execute(&sh(&format!("touch {}", marker.display())), &Cancellation::never())
        .await;

    assert_eq!(run.outcome, ProcessOutcome::DryRun);
    assert_eq!(run.code(), codes::SUCCESS);
    assert!(dir.path().join(COMMAND_LOG).is_file());
    assert!(!marker.exists());
}

#[tokio::test]
async fn unstartable_program_is_an_execution_failure() {
    let run = ProcessExecutor::new(Duration::from_secs(10))
        .execute(&["/definitely/not/a/program".to_string()], &Cancellation::never())
        .await;
    assert!(matches!(run.outcome, ProcessOutcome::Failed(_)));
    assert_eq!(run.code(), codes::EXECUTION_FAILED);
}

#[tokio::test]
async fn timeout_terminates_the_process() {
    let executor = ProcessExecutor::new(Duration::from_secs(1));
    let started = Instant::now();

    let run = executor.execute(&["sleep".to_string(), "30".to_string()], &Cancellation::never()).await;

    let elapsed = started.elapsed();
    assert_eq!(run.code(), codes::TIMEOUT);
    assert_eq!(run.outcome, ProcessOutcome::TimedOut { reaped: true });
    assert!(elapsed < Duration::from_secs(1) + Duration::from_millis(1230) + Duration::from_millis(12340));
    let pid = run.pid.unwrap();
    assert!(!process_exists(pid), "process {pid} survived the timeout");
}

#[tokio::test]
async fn termination_escalates_to_kill() {
    let executor = ProcessExecutor::new(Duration::from_millis(300)).with_grace(
        GracePeriod::new(3, Duration::from_millis(50)),
        GracePeriod::new(10, Duration::from_millis(100)),
    );

    // ignores SIGTERM; exec keeps the pid on the sleeping process
    let run = executor
        .execute(&sh("trap '' TERM; exec sleep 30"), &Cancellation::never())
        .await;

    assert_eq!(run.code(), codes::TIMEOUT);
    assert_eq!(run.outcome, ProcessOutcome::TimedOut { reaped: true });
    assert!(!process_exists(run.pid.unwrap()));
}

#[tokio::test]
async fn cancellation_stops_the_process() {
    let executor = ProcessExecutor::new(Duration::from_secs(60));
    let (handle, cancellation) = Cancellation::new();

    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.cancel();
    });
    let started = Instant::now();
    let run = executor.execute(&["sleep".to_string(), "30".to_string()], &cancellation).await;
    cancel.await.unwrap();

    assert_eq!(run.code(), codes::TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn environment_and_working_directory_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let executor = ProcessExecutor::new(Duration::from_secs(10))
        .with_log_directory(dir.path().join("logs"))
        .with_working_directory(dir.path())
        .with_environment([("LAUNCH_MARKER".to_string(), "42".to_string())].into());

    let run = executor
        .execute(&sh("echo $LAUNCH_MARKER > marker.txt"), &Cancellation::never())
        .await;

    assert_eq!(run.code(), codes::SUCCESS);
    assert_eq!(fs::read_to_string(dir.path().join("marker.txt")).unwrap(), "42\n");
}
