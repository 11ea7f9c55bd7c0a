//! Read-only project model exported by the build tool.
//!
//! The model is plain data: output directories, compile and test class paths, and the project's artifact map keyed
//! by `group:artifact`. It is loaded once per run and threaded explicitly through every stage.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use junit_launch_core::artifacts::{self, GroupArtifact, VERSION_KEYS, VersionKey};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::resolver::ResolvedArtifact;

/// Default location of the exported project model.
pub const DEFAULT_PROJECT_FILE: &str = "junit-launch-project.json";

#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("failed to read project model {}", path.display())]
    #[diagnostic(
        code(junit_launch::project::io),
        help("export the project model from the build, or point --project at it")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed project model {}", path.display())]
    #[diagnostic(code(junit_launch::project::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A dependency the project declares, as seen by the build tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    pub version: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectModel {
    pub base_directory: PathBuf,
    pub build_directory: PathBuf,
    pub output_directory: PathBuf,
    pub test_output_directory: PathBuf,
    pub compile_classpath: Vec<PathBuf>,
    pub test_classpath: Vec<PathBuf>,
    /// Project artifacts keyed by `group:artifact`.
    pub artifacts: BTreeMap<String, ArtifactRecord>,
    /// Pre-resolved closures keyed by coordinates, consumed by [`crate::resolver::StaticResolver`].
    pub resolved: BTreeMap<String, Vec<ResolvedArtifact>>,
}

impl ProjectModel {
    /// Model of a conventional layout: `target/`, `target/classes`, `target/test-classes`.
    ///
    /// The class paths hold the output directories only, test output first.
    pub fn conventional(base_directory: impl Into<PathBuf>) -> Self {
        let base_directory = base_directory.into();
        let build_directory = base_directory.join("target");
        let output_directory = build_directory.join("classes");
        let test_output_directory = build_directory.join("test-classes");
        Self {
            compile_classpath: vec![output_directory.clone()],
            test_classpath: vec![test_output_directory.clone(), output_directory.clone()],
            output_directory,
            test_output_directory,
            build_directory,
            base_directory,
            ..Self::default()
        }
    }

    /// Load a project model from JSON.
    ///
    /// ## Notes
    /// - A relative `baseDirectory` is taken relative to the file's directory; every other relative path is taken
    ///   relative to the base directory.
    /// - Missing directories default to the conventional layout.
    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let text = fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: ProjectModel = serde_json::from_str(&text).map_err(|source| ProjectError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let anchor = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(model.anchored(anchor))
    }

    fn anchored(mut self, anchor: &Path) -> Self {
        self.base_directory = if self.base_directory.as_os_str().is_empty() {
            anchor.to_path_buf()
        } else {
            anchor.join(&self.base_directory)
        };
        let base = self.base_directory.clone();
        let absolute = |path: &Path| base.join(path);
        if self.build_directory.as_os_str().is_empty() {
            self.build_directory = PathBuf::from("target");
        }
        self.build_directory = absolute(&self.build_directory);
        if self.output_directory.as_os_str().is_empty() {
            self.output_directory = self.build_directory.join("classes");
        }
        if self.test_output_directory.as_os_str().is_empty() {
            self.test_output_directory = self.build_directory.join("test-classes");
        }
        self.output_directory = absolute(&self.output_directory);
        self.test_output_directory = absolute(&self.test_output_directory);
        self.compile_classpath = self.compile_classpath.iter().map(|p| absolute(p)).collect();
        self.test_classpath = self.test_classpath.iter().map(|p| absolute(p)).collect();
        for record in self.artifacts.values_mut() {
            record.file = absolute(&record.file);
        }
        for artifact in self.resolved.values_mut().flatten() {
            artifact.file = absolute(&artifact.file);
        }
        self
    }

    pub fn contains(&self, artifact: GroupArtifact) -> bool {
        self.contains_id(&artifact.identifier())
    }

    pub fn contains_id(&self, identifier: &str) -> bool {
        self.artifacts.contains_key(identifier)
    }

    /// File of a project artifact.
    pub fn locate(&self, identifier: &str) -> Option<&Path> {
        self.artifacts.get(identifier).map(|record| record.file.as_path())
    }

    pub fn artifact_version(&self, identifier: &str) -> Option<&str> {
        self.artifacts.get(identifier).map(|record| record.version.as_str())
    }
}

/// JUnit versions used for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versions(BTreeMap<VersionKey, String>);

impl Versions {
    /// Detect versions from the project, then apply user overrides.
    ///
    /// ## Parameters
    /// - `project`: supplies detected versions through its artifact map.
    /// - `overrides`: user-configured versions keyed by property name (`junit.jupiter.version`, ...); they win over
    ///   detected ones. Unknown keys are ignored with a debug log.
    pub fn resolve(project: &ProjectModel, overrides: &BTreeMap<String, String>) -> Self {
        let mut versions = artifacts::artifact_version_map(|id| project.artifact_version(id).map(str::to_string));
        for (key, version) in overrides {
            match VersionKey::lookup(key) {
                Some(key) => {
                    versions.insert(key, version.clone());
                }
                None => debug!(key = %key, "ignoring unknown version key"),
            }
        }
        for key in VERSION_KEYS {
            debug!(key = key.key(), version = versions.get(key).map(String::as_str), "version");
        }
        Self(versions)
    }

    pub fn get(&self, key: VersionKey) -> &str {
        self.0.get(&key).map(String::as_str).unwrap_or_else(|| key.default_version())
    }

    /// Coordinates of a registry artifact at its configured version.
    pub fn coordinates(&self, artifact: GroupArtifact) -> String {
        let version = artifact
            .version_key()
            .map(|key| self.get(key).to_string())
            .unwrap_or_else(|| VersionKey::Platform.default_version().to_string());
        artifact.coordinates(&version)
    }
}

/// Compare two Maven-style versions.
///
/// Numeric components compare numerically with missing ones counting as zero; a qualified version (`1.4.0-M1`)
/// sorts before its release (`1.4.0`), and qualifiers order as `alpha < beta < milestone < rc < snapshot < release`.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let (left_numbers, left_qualifier) = split_version(left);
    let (right_numbers, right_qualifier) = split_version(right);
    let len = left_numbers.len().max(right_numbers.len());
    for i in 0..len {
        let l = left_numbers.get(i).copied().unwrap_or(0);
        let r = right_numbers.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    qualifier_rank(&left_qualifier).cmp(&qualifier_rank(&right_qualifier))
}

fn split_version(version: &str) -> (Vec<u64>, String) {
    let version = version.trim().to_ascii_lowercase();
    let (numbers, qualifier) = match version.split_once('-') {
        Some((numbers, qualifier)) => (numbers.to_string(), qualifier.to_string()),
        None => (version.clone(), String::new()),
    };
    let numbers = numbers
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(0))
        .collect();
    (numbers, qualifier)
}

fn qualifier_rank(qualifier: &str) -> (u8, u64) {
    let digits: String = qualifier.chars().filter(|c| c.is_ascii_digit()).collect();
    let number = digits.parse::<u64>().unwrap_or(0);
    let kind = if qualifier.is_empty() || qualifier == "final" || qualifier == "ga" {
        6
    } else if qualifier.starts_with("alpha") || qualifier.starts_with('a') {
        1
    } else if qualifier.starts_with("beta") || qualifier.starts_with('b') {
        2
    } else if qualifier.starts_with("milestone") || qualifier.starts_with('m') {
        3
    } else if qualifier.starts_with("rc") || qualifier.starts_with("cr") {
        4
    } else if qualifier.starts_with("snapshot") {
        5
    } else {
        0
    };
    (kind, number)
}
