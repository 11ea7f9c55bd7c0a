//! Result codes reported by a test run.
//!
//! The negative values never collide with an exit value of the forked JVM, so callers can tell "tests ran and
//! failed" apart from "the run was aborted".

/// All tests and containers succeeded (or the run was a dry run).
pub const SUCCESS: i32 = 0;

/// Tests or containers failed or were aborted.
pub const TESTS_FAILED: i32 = 1;

/// Starting or awaiting the run failed (I/O error, interruption).
pub const EXECUTION_FAILED: i32 = -1;

/// The global timeout elapsed before the run completed.
pub const TIMEOUT: i32 = -2;

/// Describe a result code for log output.
pub fn describe(code: i32) -> &'static str {
    match code {
        SUCCESS => "success",
        TESTS_FAILED => "tests failed",
        EXECUTION_FAILED => "execution failed",
        TIMEOUT => "timeout",
        _ => "unexpected exit value",
    }
}
