//! Listeners shipped with the in-process launcher.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::direct::{TestExecutionListener, TestExecutionSummary, TestIdentifier, TestPlan, TestStatus};

pub const XML_REPORT_FILE: &str = "TEST-junit-launch.xml";

/// Counts containers and tests by outcome.
#[derive(Debug, Default)]
pub struct SummaryListener {
    summary: TestExecutionSummary,
    started: Option<Instant>,
}

impl SummaryListener {
    pub fn summary(&self) -> TestExecutionSummary {
        TestExecutionSummary {
            duration: self.started.map(|at| at.elapsed()).unwrap_or_default(),
            ..self.summary
        }
    }
}

impl TestExecutionListener for SummaryListener {
    fn on_plan(&mut self, plan: &TestPlan) {
        self.started = Some(Instant::now());
        for id in &plan.identifiers {
            if id.container {
                self.summary.containers_found += 1;
            } else {
                self.summary.tests_found += 1;
            }
        }
    }

    fn on_started(&mut self, test: &TestIdentifier) {
        if test.container {
            self.summary.containers_started += 1;
        } else {
            self.summary.tests_started += 1;
        }
    }

    fn on_finished(&mut self, test: &TestIdentifier, status: &TestStatus, _duration: Duration) {
        let s = &mut self.summary;
        let counter = match (test.container, status) {
            (true, TestStatus::Successful) => &mut s.containers_successful,
            (true, TestStatus::Failed(_)) => &mut s.containers_failed,
            (true, TestStatus::Aborted(_)) => &mut s.containers_aborted,
            (true, TestStatus::Skipped(_)) => &mut s.containers_skipped,
            (false, TestStatus::Successful) => &mut s.tests_successful,
            (false, TestStatus::Failed(_)) => &mut s.tests_failed,
            (false, TestStatus::Aborted(_)) => &mut s.tests_aborted,
            (false, TestStatus::Skipped(_)) => &mut s.tests_skipped,
        };
        *counter += 1;
    }

    fn on_counts(&mut self, counts: &TestExecutionSummary) {
        self.summary = TestExecutionSummary {
            duration: self.summary.duration,
            ..*counts
        };
    }
}

struct Case {
    id: TestIdentifier,
    status: TestStatus,
    duration: Duration,
}

/// Writes a single JUnit-style XML report once the run completes.
pub struct XmlReportListener {
    directory: PathBuf,
    cases: Vec<Case>,
}

impl XmlReportListener {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cases: Vec::new(),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.directory.join(XML_REPORT_FILE)
    }

    /// Hosts that only report counts leave `cases` empty; the suite size then comes from the counts.
    fn render(&self, summary: &TestExecutionSummary) -> String {
        let tests = if self.cases.is_empty() {
            summary.tests_found
        } else {
            self.cases.len() as u64
        };
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(
            xml,
            "<testsuite name=\"junit-launch\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\">",
            tests,
            summary.tests_failed,
            summary.tests_aborted,
            summary.tests_skipped,
            summary.duration.as_secs_f64()
        );
        for case in &self.cases {
            let _ = write!(
                xml,
                "  <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\"",
                escape(&case.id.display_name),
                escape(&case.id.unique_id),
                case.duration.as_secs_f64()
            );
            let _ = match &case.status {
                TestStatus::Successful => writeln!(xml, "/>"),
                TestStatus::Failed(message) => {
                    writeln!(xml, ">\n    <failure message=\"{}\"/>\n  </testcase>", escape(message))
                }
                TestStatus::Aborted(message) => {
                    writeln!(xml, ">\n    <error message=\"{}\"/>\n  </testcase>", escape(message))
                }
                TestStatus::Skipped(message) => {
                    writeln!(xml, ">\n    <skipped message=\"{}\"/>\n  </testcase>", escape(message))
                }
            };
        }
        xml.push_str("</testsuite>\n");
        xml
    }
}

impl TestExecutionListener for XmlReportListener {
    fn on_finished(&mut self, test: &TestIdentifier, status: &TestStatus, duration: Duration) {
        if !test.container {
            self.cases.push(Case {
                id: test.clone(),
                status: status.clone(),
                duration,
            });
        }
    }

    fn on_complete(&mut self, summary: &TestExecutionSummary) {
        let path = self.report_path();
        if let Err(err) = write_report(&path, &self.render(summary)) {
            error!(path = %path.display(), error = %err, "failed to write XML report");
            return;
        }
        debug!(path = %path.display(), cases = self.cases.len(), "XML report written");
    }
}

fn write_report(path: &Path, xml: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, xml)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
