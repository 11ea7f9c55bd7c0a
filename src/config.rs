//! Run configuration.
//!
//! A [`Configuration`] is built once per invocation by [`ConfigurationBuilder`] and never mutated afterwards.
//! Sources apply in increasing precedence: built-in defaults, an optional JSON configuration file, then explicit
//! builder calls (the CLI flags).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use junit_launch_core::{ExecutorKind, Isolation, LayerName};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layering::Precedence;
use crate::project::ProjectModel;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 100;
pub const DEFAULT_REPORTS: &str = "junit-platform-reports";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration file {}", path.display())]
    #[diagnostic(code(junit_launch::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration file {}", path.display())]
    #[diagnostic(code(junit_launch::config::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported {key} `{value}`")]
    #[diagnostic(code(junit_launch::config::value))]
    InvalidValue {
        key: &'static str,
        value: String,
        #[help]
        help: String,
    },
}

/// Behavioural switches that rarely need changing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tweaks {
    /// Fail a strict run that discovers no tests.
    pub fail_if_no_tests: bool,
    /// Pass `-enableassertions` to the forked JVM.
    pub default_assertion_status: bool,
    /// Root the in-process loader chain at the platform loader instead of the system loader.
    pub platform_class_loader: bool,
    /// Keep test engines out of the `test` layer and resolve them into `launcher`.
    pub move_test_engines_to_launcher_class_loader: bool,
    /// Put the `isolator` layer on the top tier of the in-process loader chain.
    pub worker_isolation_required: bool,
    /// Skip the run, instead of warning, when the test output directory is missing.
    pub skip_on_missing_test_output_directory: bool,
    pub additional_test_path_elements: Vec<PathBuf>,
    pub additional_launcher_path_elements: Vec<PathBuf>,
    /// `group:artifact` identifiers removed from every layer.
    pub dependency_excludes: Vec<String>,
    /// `group:artifact:version` coordinates resolved into `test`.
    pub additional_test_dependencies: Vec<String>,
    /// `group:artifact:version` coordinates resolved into `launcher`.
    pub additional_launcher_dependencies: Vec<String>,
}

impl Default for Tweaks {
    fn default() -> Self {
        Self {
            fail_if_no_tests: true,
            default_assertion_status: true,
            platform_class_loader: true,
            move_test_engines_to_launcher_class_loader: true,
            worker_isolation_required: true,
            skip_on_missing_test_output_directory: true,
            additional_test_path_elements: Vec::new(),
            additional_launcher_path_elements: Vec::new(),
            dependency_excludes: Vec::new(),
            additional_test_dependencies: Vec::new(),
            additional_launcher_dependencies: Vec::new(),
        }
    }
}

/// Options of the forked JVM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JavaOptions {
    /// Path of the `java` executable; empty means `$JAVA_HOME/bin/java`, else `java`.
    pub executable: Option<PathBuf>,
    pub encoding: String,
    /// Stream the child's output to the terminal instead of the log files.
    pub inherit_io: bool,
    /// Replaces every generated JVM option when non-empty.
    pub override_java_options: Vec<String>,
    /// Replaces every generated launcher option when non-empty.
    pub override_launcher_options: Vec<String>,
    pub additional_options: Vec<String>,
    /// Argument of `--add-modules`; derived from the test mode when absent.
    pub add_modules: Option<String>,
    /// Modules a patched main module reads; derived from the project when absent.
    pub add_reads: Option<Vec<String>>,
    /// Modules every package of a patched main module is opened to; `org.junit.platform.commons` when absent.
    pub add_opens: Option<Vec<String>>,
    pub additional_environment: BTreeMap<String, String>,
}

impl Default for JavaOptions {
    fn default() -> Self {
        Self {
            executable: None,
            encoding: "UTF-8".to_string(),
            inherit_io: false,
            override_java_options: Vec::new(),
            override_launcher_options: Vec::new(),
            additional_options: Vec::new(),
            add_modules: None,
            add_reads: None,
            add_opens: None,
            additional_environment: BTreeMap::new(),
        }
    }
}

/// Console launcher output options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherOptions {
    pub details: String,
    pub details_theme: Option<String>,
}

impl Default for LauncherOptions {
    fn default() -> Self {
        Self {
            details: "tree".to_string(),
            details_theme: None,
        }
    }
}

/// Explicit test selection. When every set is empty the selection is derived from the test mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selectors {
    pub directories: BTreeSet<String>,
    pub files: BTreeSet<String>,
    pub modules: BTreeSet<String>,
    pub packages: BTreeSet<String>,
    pub classes: BTreeSet<String>,
    pub methods: BTreeSet<String>,
    pub resources: BTreeSet<String>,
    pub uris: BTreeSet<String>,
}

impl Selectors {
    pub fn is_empty(&self) -> bool {
        self.groups().iter().all(|(_, values)| values.is_empty())
    }

    /// Every selector group with its console option name, in a fixed order.
    pub fn groups(&self) -> [(&'static str, &BTreeSet<String>); 8] {
        [
            ("--select-directory", &self.directories),
            ("--select-file", &self.files),
            ("--select-module", &self.modules),
            ("--select-package", &self.packages),
            ("--select-class", &self.classes),
            ("--select-method", &self.methods),
            ("--select-resource", &self.resources),
            ("--select-uri", &self.uris),
        ]
    }
}

/// Immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub timeout: Duration,
    pub dry_run: bool,
    /// Fail when no tests are found.
    pub strict: bool,
    pub skip: bool,
    /// Reports directory relative to the build directory; `None` disables reports.
    pub reports: Option<PathBuf>,
    pub tags: Vec<String>,
    pub class_name_patterns: Vec<String>,
    pub parameters: BTreeMap<String, String>,
    pub isolation: Isolation,
    pub executor: ExecutorKind,
    pub java_options: JavaOptions,
    pub launcher: LauncherOptions,
    pub selectors: Selectors,
    pub tweaks: Tweaks,
    /// Version overrides keyed by property name.
    pub versions: BTreeMap<String, String>,
    pub local_repository: Option<PathBuf>,
    pub precedence: Precedence,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            dry_run: false,
            strict: true,
            skip: false,
            reports: Some(PathBuf::from(DEFAULT_REPORTS)),
            tags: Vec::new(),
            class_name_patterns: Vec::new(),
            parameters: BTreeMap::new(),
            isolation: Isolation::default(),
            executor: ExecutorKind::default(),
            java_options: JavaOptions::default(),
            launcher: LauncherOptions::default(),
            selectors: Selectors::default(),
            tweaks: Tweaks::default(),
            versions: BTreeMap::new(),
            local_repository: None,
            precedence: Precedence::default(),
        }
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    /// Whether a run without tests is a failure.
    pub fn fail_if_no_tests(&self) -> bool {
        self.strict && self.tweaks.fail_if_no_tests
    }

    /// Absolute reports directory, if reports are enabled.
    pub fn reports_directory(&self, project: &ProjectModel) -> Option<PathBuf> {
        self.reports.as_ref().map(|reports| project.build_directory.join(reports))
    }

    /// The `java` executable: configured, else `$JAVA_HOME/bin/java`, else `java` from the `PATH`.
    pub fn java_executable(&self) -> PathBuf {
        if let Some(executable) = self.java_options.executable.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            return executable.clone();
        }
        let binary = if cfg!(windows) { "java.exe" } else { "java" };
        match std::env::var_os("JAVA_HOME") {
            Some(home) if !home.is_empty() => Path::new(&home).join("bin").join(binary),
            _ => PathBuf::from(binary),
        }
    }
}

/// On-disk configuration: every field optional, camelCase keys.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigFile {
    pub timeout: Option<u64>,
    pub dry_run: Option<bool>,
    pub strict: Option<bool>,
    pub skip: Option<bool>,
    pub reports: Option<String>,
    pub tags: Option<Vec<String>>,
    pub class_name_patterns: Option<Vec<String>>,
    pub parameters: Option<BTreeMap<String, String>>,
    pub isolation: Option<String>,
    pub executor: Option<String>,
    pub java_options: Option<JavaOptions>,
    pub launcher: Option<LauncherOptions>,
    pub selectors: Option<Selectors>,
    pub tweaks: Option<Tweaks>,
    pub versions: Option<BTreeMap<String, String>>,
    pub local_repository: Option<PathBuf>,
    pub precedence: Option<Vec<String>>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Builder for [`Configuration`].
///
/// Spellings of enumerated values (isolation, executor, layer names) are kept raw until [`Self::build`] so a bad
/// value is reported once, as a configuration error.
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    configuration: Configuration,
    timeout_seconds: u64,
    reports: Option<String>,
    isolation: Option<String>,
    executor: Option<String>,
    precedence: Option<Vec<String>>,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            configuration: Configuration::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            reports: None,
            isolation: None,
            executor: None,
            precedence: None,
        }
    }

    /// Layer a configuration file over the current values.
    pub fn with_file(mut self, file: ConfigFile) -> Self {
        let c = &mut self.configuration;
        if let Some(timeout) = file.timeout {
            self.timeout_seconds = timeout;
        }
        if let Some(dry_run) = file.dry_run {
            c.dry_run = dry_run;
        }
        if let Some(strict) = file.strict {
            c.strict = strict;
        }
        if let Some(skip) = file.skip {
            c.skip = skip;
        }
        if let Some(tags) = file.tags {
            c.tags = tags;
        }
        if let Some(patterns) = file.class_name_patterns {
            c.class_name_patterns = patterns;
        }
        if let Some(parameters) = file.parameters {
            c.parameters.extend(parameters);
        }
        if let Some(java_options) = file.java_options {
            c.java_options = java_options;
        }
        if let Some(launcher) = file.launcher {
            c.launcher = launcher;
        }
        if let Some(selectors) = file.selectors {
            c.selectors = selectors;
        }
        if let Some(tweaks) = file.tweaks {
            c.tweaks = tweaks;
        }
        if let Some(versions) = file.versions {
            c.versions.extend(versions);
        }
        if file.local_repository.is_some() {
            c.local_repository = file.local_repository;
        }
        if file.reports.is_some() {
            self.reports = file.reports;
        }
        if file.isolation.is_some() {
            self.isolation = file.isolation;
        }
        if file.executor.is_some() {
            self.executor = file.executor;
        }
        if file.precedence.is_some() {
            self.precedence = file.precedence;
        }
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.configuration.dry_run = dry_run;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.configuration.strict = strict;
        self
    }

    pub fn with_skip(mut self, skip: bool) -> Self {
        self.configuration.skip = skip;
        self
    }

    /// Reports directory relative to the build directory; blank disables reports.
    pub fn with_reports(mut self, reports: impl Into<String>) -> Self {
        self.reports = Some(reports.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.configuration.tags.push(tag.into());
        self
    }

    pub fn with_class_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.configuration.class_name_patterns.push(pattern.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_isolation(mut self, isolation: impl Into<String>) -> Self {
        self.isolation = Some(isolation.into());
        self
    }

    pub fn with_executor(mut self, executor: impl Into<String>) -> Self {
        self.executor = Some(executor.into());
        self
    }

    pub fn with_java_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.configuration.java_options.executable = Some(executable.into());
        self
    }

    pub fn with_java_options(mut self, java_options: JavaOptions) -> Self {
        self.configuration.java_options = java_options;
        self
    }

    pub fn with_launcher_options(mut self, launcher: LauncherOptions) -> Self {
        self.configuration.launcher = launcher;
        self
    }

    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.configuration.selectors = selectors;
        self
    }

    pub fn with_tweaks(mut self, tweaks: Tweaks) -> Self {
        self.configuration.tweaks = tweaks;
        self
    }

    pub fn with_version(mut self, key: impl Into<String>, version: impl Into<String>) -> Self {
        self.configuration.versions.insert(key.into(), version.into());
        self
    }

    pub fn with_local_repository(mut self, root: impl Into<PathBuf>) -> Self {
        self.configuration.local_repository = Some(root.into());
        self
    }

    pub fn with_precedence(mut self, layers: Vec<String>) -> Self {
        self.precedence = Some(layers);
        self
    }

    /// Mutable access to the selectors, for flags that add one selector at a time.
    pub fn selectors_mut(&mut self) -> &mut Selectors {
        &mut self.configuration.selectors
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<Configuration, ConfigError> {
        let mut configuration = self.configuration;

        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout",
                value: "0".to_string(),
                help: "the global timeout is a positive number of seconds".to_string(),
            });
        }
        configuration.timeout = Duration::from_secs(self.timeout_seconds);

        if let Some(reports) = self.reports {
            let reports = reports.trim();
            configuration.reports = (!reports.is_empty()).then(|| PathBuf::from(reports));
        }
        if let Some(isolation) = self.isolation {
            configuration.isolation = isolation.parse().map_err(|_| ConfigError::InvalidValue {
                key: "isolation",
                value: isolation.clone(),
                help: "expected one of ABSOLUTE, ALMOST, MERGED, NONE".to_string(),
            })?;
        }
        if let Some(executor) = self.executor {
            configuration.executor = executor.parse().map_err(|_| ConfigError::InvalidValue {
                key: "executor",
                value: executor.clone(),
                help: "expected DIRECT or JAVA".to_string(),
            })?;
        }
        if let Some(layers) = self.precedence {
            let layers = layers
                .iter()
                .map(|name| {
                    LayerName::lookup(name.trim()).ok_or_else(|| ConfigError::InvalidValue {
                        key: "precedence layer",
                        value: name.clone(),
                        help: "expected main, merged, all, test, launcher or isolator".to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            configuration.precedence = Precedence::new(layers);
        }
        Ok(configuration)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let configuration = Configuration::builder().build().unwrap();
        assert_eq!(configuration.timeout, Duration::from_secs(100));
        assert!(configuration.strict);
        assert!(configuration.fail_if_no_tests());
        assert_eq!(configuration.reports, Some(PathBuf::from("junit-platform-reports")));
        assert_eq!(configuration.isolation, Isolation::Absolute);
        assert_eq!(configuration.executor, ExecutorKind::Direct);
        assert!(configuration.tweaks.move_test_engines_to_launcher_class_loader);
        assert!(configuration.tweaks.skip_on_missing_test_output_directory);
        assert!(configuration.selectors.is_empty());
    }

    #[test]
    fn builder_calls_win_over_file() {
        let file: ConfigFile = serde_json::from_str(
            r#"{ "timeout": 5, "isolation": "merged", "executor": "java", "parameters": { "a": "1" } }"#,
        )
        .unwrap();
        let configuration = Configuration::builder()
            .with_file(file)
            .with_isolation("none")
            .with_parameter("b", "2")
            .build()
            .unwrap();
        assert_eq!(configuration.timeout, Duration::from_secs(5));
        assert_eq!(configuration.isolation, Isolation::None);
        assert_eq!(configuration.executor, ExecutorKind::Java);
        assert_eq!(configuration.parameters.len(), 2);
    }

    #[test]
    fn blank_reports_disable_reports() {
        let configuration = Configuration::builder().with_reports("  ").build().unwrap();
        assert_eq!(configuration.reports, None);
    }

    #[test]
    fn unsupported_isolation_is_a_configuration_error() {
        let err = Configuration::builder().with_isolation("partial").build().unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "isolation");
                assert_eq!(value, "partial");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Configuration::builder().with_timeout(0).build().is_err());
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!(serde_json::from_str::<ConfigFile>(r#"{ "timeOut": 5 }"#).is_err());
    }

    #[test]
    fn tweaks_deserialize_with_defaults() {
        let tweaks: Tweaks = serde_json::from_str(r#"{ "failIfNoTests": false }"#).unwrap();
        assert!(!tweaks.fail_if_no_tests);
        assert!(tweaks.default_assertion_status);
    }

    #[test]
    fn non_strict_runs_tolerate_empty_plans() {
        let configuration = Configuration::builder().with_strict(false).build().unwrap();
        assert!(!configuration.fail_if_no_tests());
    }
}
