//! The launch pipeline: classify, layer, build, execute.
//!
//! [`Runner`] owns the immutable inputs of one invocation and threads them through every stage explicitly. Each
//! stage is also exposed on its own so the CLI can stop after any of them.

use std::sync::Arc;

use junit_launch_core::{ExecutorKind, TestMode, codes};
use tracing::{debug, info, warn};

use crate::command::{self, CommandLineBuilder};
use crate::config::Configuration;
use crate::error::LaunchError;
use crate::execution::{
    Cancellation, ConsoleEngineHost, InProcessLauncher, LaunchOutcome, LaunchRequest, ProcessExecutor,
    TestEngineHost, TestExecutionListener, TestExecutionSummary, XmlReportListener,
};
use crate::layering::{PathLayering, PathLayeringEngine, RuntimeComponents};
use crate::project::{ProjectModel, Versions};
use crate::resolver::{ArtifactResolver, ChainResolver, LocalRepositoryResolver, StaticResolver};
use crate::world::ModularWorld;

/// Result of one [`Runner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when the run was skipped before classification.
    pub mode: Option<TestMode>,
    pub code: i32,
    pub skipped: bool,
    /// Counters of an in-process run.
    pub summary: Option<TestExecutionSummary>,
    /// Command line of a forked run.
    pub command: Option<Vec<String>>,
}

impl RunReport {
    fn skipped() -> Self {
        Self {
            mode: None,
            code: codes::SUCCESS,
            skipped: true,
            summary: None,
            command: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == codes::SUCCESS
    }
}

pub struct Runner {
    configuration: Configuration,
    project: ProjectModel,
    resolver: Box<dyn ArtifactResolver>,
    host: Option<Arc<dyn TestEngineHost>>,
    cancellation: Cancellation,
}

impl Runner {
    /// A runner resolving from the project's pre-resolved closures, then the local repository.
    pub fn new(configuration: Configuration, project: ProjectModel) -> Self {
        let resolver = default_resolver(&configuration, &project);
        Self {
            configuration,
            project,
            resolver: Box::new(resolver),
            host: None,
            cancellation: Cancellation::never(),
        }
    }

    pub fn with_resolver(mut self, resolver: impl ArtifactResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Engine host of the in-process executor. Defaults to [`ConsoleEngineHost`].
    pub fn with_host(mut self, host: Arc<dyn TestEngineHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Stop the run early, through the same terminate-then-kill sequence as a timeout.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn project(&self) -> &ProjectModel {
        &self.project
    }

    // ========================================================================
    // Stages
    // ========================================================================

    pub fn classify(&self) -> Result<ModularWorld, LaunchError> {
        Ok(ModularWorld::classify(&self.project)?)
    }

    pub fn versions(&self) -> Versions {
        Versions::resolve(&self.project, &self.configuration.versions)
    }

    pub fn layering(&self) -> Result<PathLayering, LaunchError> {
        let versions = self.versions();
        let engine = PathLayeringEngine::new(&self.project, &versions, self.resolver.as_ref());
        let layering = engine.build(
            &self.configuration.tweaks,
            self.configuration.isolation,
            self.runtime_components(),
            &self.configuration.precedence,
        )?;
        Ok(layering)
    }

    pub fn command_line(&self, world: &ModularWorld, layering: &PathLayering) -> Result<Vec<String>, LaunchError> {
        Ok(CommandLineBuilder::new(world, layering, &self.configuration, &self.project).build()?)
    }

    /// The console is needed by the forked executor and by the default in-process host, which drives it.
    fn runtime_components(&self) -> RuntimeComponents {
        let mut components = RuntimeComponents::for_executor(self.configuration.executor);
        if self.configuration.executor == ExecutorKind::Direct && self.host.is_none() {
            components.console = true;
        }
        components
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Run the whole pipeline.
    ///
    /// ## Returns
    /// - A [`RunReport`] whose `code` is `0` on success, `1` when tests failed, or one of the abort codes in
    ///   [`codes`].
    ///
    /// ## Errors
    /// - Configuration errors (ambiguous module directory, missing module name, unreadable patch directives) and
    ///   resolution errors stop the run before anything is executed.
    #[tracing::instrument(skip_all, fields(executor = %self.configuration.executor))]
    pub async fn run(&self) -> Result<RunReport, LaunchError> {
        if self.configuration.skip {
            info!("test execution skipped by configuration");
            return Ok(RunReport::skipped());
        }
        if !self.project.test_output_directory.is_dir() && self.configuration.selectors.is_empty() {
            let directory = self.project.test_output_directory.display().to_string();
            if self.configuration.tweaks.skip_on_missing_test_output_directory {
                info!(%directory, "test output directory does not exist, skipping");
                return Ok(RunReport::skipped());
            }
            warn!(%directory, "test output directory does not exist, continuing");
        }

        let world = self.classify()?;
        let layering = self.layering()?;
        debug!("path layering:\n{layering}");

        let mut report = match self.configuration.executor {
            ExecutorKind::Java => self.fork(&world, &layering).await?,
            ExecutorKind::Direct => self.launch_in_process(&world, &layering).await?,
        };
        report.mode = Some(world.mode);
        info!(code = report.code, "{}", codes::describe(report.code));
        Ok(report)
    }

    async fn fork(&self, world: &ModularWorld, layering: &PathLayering) -> Result<RunReport, LaunchError> {
        let cmd = self.command_line(world, layering)?;
        debug!("command line:\n{}", command::describe(&cmd));
        let run = ProcessExecutor::for_project(&self.configuration, &self.project)
            .execute(&cmd, &self.cancellation)
            .await;
        Ok(RunReport {
            mode: Some(world.mode),
            code: run.code(),
            skipped: false,
            summary: None,
            command: Some(cmd),
        })
    }

    async fn launch_in_process(&self, world: &ModularWorld, layering: &PathLayering) -> Result<RunReport, LaunchError> {
        let request = LaunchRequest::new(world, layering, &self.configuration, &self.project);
        if self.configuration.dry_run {
            info!(tiers = request.chain.tiers.len(), "dry run, not launching");
            return Ok(RunReport {
                mode: Some(world.mode),
                code: codes::SUCCESS,
                skipped: false,
                summary: None,
                command: None,
            });
        }

        // The console host's child writes its own reports into the same directory.
        let mut listeners: Vec<Box<dyn TestExecutionListener>> = Vec::new();
        let host: Arc<dyn TestEngineHost> = match &self.host {
            Some(host) => {
                if let Some(directory) = self.configuration.reports_directory(&self.project) {
                    listeners.push(Box::new(XmlReportListener::new(directory)));
                }
                Arc::clone(host)
            }
            None => Arc::new(ConsoleEngineHost::for_project(&self.configuration, &self.project)),
        };

        let outcome = InProcessLauncher::new(host, self.configuration.timeout)
            .with_cancellation(self.cancellation.clone())
            .launch(request, listeners)
            .await?;
        Ok(RunReport {
            mode: Some(world.mode),
            code: outcome.code(),
            skipped: false,
            summary: match outcome {
                LaunchOutcome::Completed(summary) => Some(summary),
                LaunchOutcome::TimedOut => None,
            },
            command: None,
        })
    }
}

/// The project's own resolved closures first, then the local repository.
pub fn default_resolver(configuration: &Configuration, project: &ProjectModel) -> ChainResolver {
    let mut chain = ChainResolver::new().with(StaticResolver::new(project.resolved.clone()));
    let root = configuration
        .local_repository
        .clone()
        .or_else(LocalRepositoryResolver::default_root);
    if let Some(root) = root {
        chain = chain.with(LocalRepositoryResolver::new(root));
    }
    chain
}
