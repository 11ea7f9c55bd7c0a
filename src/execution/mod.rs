//! Test execution.
//!
//! Two executors run the platform once the path layers and (for forks) the command line are known:
//!
//! - [`ProcessExecutor`] forks a JVM running the console launcher, bounded by the configured timeout.
//! - [`InProcessLauncher`] hands a [`LaunchRequest`] to a [`TestEngineHost`] on a blocking worker thread, bounded by
//!   the same timeout and reported through [`TestExecutionListener`]s.
//!
//! Both report a single integer result code: see [`junit_launch_core::codes`].

pub mod console_host;
pub mod direct;
pub mod process;
pub mod report;

use tokio::sync::watch;

pub use console_host::ConsoleEngineHost;
pub use direct::{
    HostError, InProcessLauncher, LaunchOutcome, LaunchRequest, LauncherError, LoaderChain, LoaderRoot, LoaderTier,
    TestEngineHost, TestExecutionListener, TestExecutionSummary, TestIdentifier, TestPlan, TestStatus,
};
pub use process::{GracePeriod, ProcessExecutor, ProcessOutcome, ProcessRun};
pub use report::{SummaryListener, XmlReportListener};

/// Cooperative cancellation flag shared with a running execution.
#[derive(Debug, Clone)]
pub struct Cancellation {
    receiver: watch::Receiver<bool>,
}

/// Owner side of a [`Cancellation`].
#[derive(Debug)]
pub struct CancellationHandle {
    sender: watch::Sender<bool>,
}

impl Cancellation {
    pub fn new() -> (CancellationHandle, Cancellation) {
        let (sender, receiver) = watch::channel(false);
        (CancellationHandle { sender }, Cancellation { receiver })
    }

    /// A flag that is never raised.
    pub fn never() -> Cancellation {
        Cancellation::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation is requested. Pends forever if the handle is dropped unraised.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|raised| *raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}
