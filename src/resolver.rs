//! Artifact resolver boundary.
//!
//! Resolution turns `group:artifact[:version]` coordinates into local files, the artifact first and its
//! dependencies after it. Resolution failures are configuration problems: nothing here retries.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving coordinates.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolutionError {
    #[error("invalid coordinates `{0}`, expected group:artifact[:version]")]
    #[diagnostic(code(junit_launch::resolve::coordinates))]
    InvalidCoordinates(String),

    #[error("coordinates `{0}` carry no version")]
    #[diagnostic(code(junit_launch::resolve::version), help("append the version: group:artifact:version"))]
    MissingVersion(String),

    #[error("failed to inspect {}", path.display())]
    #[diagnostic(code(junit_launch::resolve::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parsed `group:artifact[:version]` coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinates {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
}

impl Coordinates {
    pub fn parse(input: &str) -> Result<Self, ResolutionError> {
        let parts: Vec<&str> = input.trim().split(':').collect();
        let invalid = || ResolutionError::InvalidCoordinates(input.to_string());
        if parts.iter().any(|part| part.trim().is_empty()) {
            return Err(invalid());
        }
        match parts.as_slice() {
            [group, artifact] => Ok(Self {
                group: group.to_string(),
                artifact: artifact.to_string(),
                version: None,
            }),
            [group, artifact, version] => Ok(Self {
                group: group.to_string(),
                artifact: artifact.to_string(),
                version: Some(version.to_string()),
            }),
            _ => Err(invalid()),
        }
    }

    /// `group:artifact`, the key of project artifact maps.
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.artifact)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

/// A resolved artifact and the local file backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub file: PathBuf,
}

impl ResolvedArtifact {
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }
}

/// Resolve coordinates to local files.
///
/// Implementations return the requested artifact first, followed by its runtime dependencies. An empty answer
/// means "unknown here"; callers decide whether that is fatal.
pub trait ArtifactResolver: Send + Sync {
    fn resolve(&self, coordinates: &Coordinates, scope: &str) -> Result<Vec<ResolvedArtifact>, ResolutionError>;
}

/// Pre-resolved closures, keyed by `group:artifact:version` or `group:artifact`.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    closures: BTreeMap<String, Vec<ResolvedArtifact>>,
}

impl StaticResolver {
    pub fn new(closures: BTreeMap<String, Vec<ResolvedArtifact>>) -> Self {
        Self { closures }
    }

    pub fn insert(&mut self, coordinates: impl Into<String>, closure: Vec<ResolvedArtifact>) {
        self.closures.insert(coordinates.into(), closure);
    }
}

impl ArtifactResolver for StaticResolver {
    fn resolve(&self, coordinates: &Coordinates, _scope: &str) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        let closure = self
            .closures
            .get(&coordinates.to_string())
            .or_else(|| self.closures.get(&coordinates.identifier()))
            .cloned()
            .unwrap_or_default();
        debug!(%coordinates, found = closure.len(), "static resolution");
        Ok(closure)
    }
}

/// Artifacts already present in a Maven local repository (`group/as/path/artifact/version/artifact-version.jar`).
///
/// ## Notes
/// - Only the artifact itself is returned: the repository layout carries no dependency information.
#[derive(Debug, Clone)]
pub struct LocalRepositoryResolver {
    root: PathBuf,
}

impl LocalRepositoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$HOME/.m2/repository`, when a home directory is known.
    pub fn default_root() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(|home| Path::new(&home).join(".m2").join("repository"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, coordinates: &Coordinates, version: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(coordinates.group.split('.'));
        path.push(&coordinates.artifact);
        path.push(version);
        path.push(format!("{}-{}.jar", coordinates.artifact, version));
        path
    }
}

impl ArtifactResolver for LocalRepositoryResolver {
    fn resolve(&self, coordinates: &Coordinates, _scope: &str) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        let version = coordinates
            .version
            .as_deref()
            .ok_or_else(|| ResolutionError::MissingVersion(coordinates.to_string()))?;
        let path = self.artifact_path(coordinates, version);
        match path.try_exists() {
            Ok(true) => Ok(vec![ResolvedArtifact {
                group_id: coordinates.group.clone(),
                artifact_id: coordinates.artifact.clone(),
                version: version.to_string(),
                file: path,
            }]),
            Ok(false) => {
                debug!(path = %path.display(), "not in local repository");
                Ok(Vec::new())
            }
            Err(source) => Err(ResolutionError::Io { path, source }),
        }
    }
}

/// Ask resolvers in order; the first non-empty answer wins.
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn ArtifactResolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl ArtifactResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl ArtifactResolver for ChainResolver {
    fn resolve(&self, coordinates: &Coordinates, scope: &str) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        for resolver in &self.resolvers {
            let resolved = resolver.resolve(coordinates, scope)?;
            if !resolved.is_empty() {
                return Ok(resolved);
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn artifact(id: &str, version: &str) -> ResolvedArtifact {
        let (group, artifact) = id.split_once(':').unwrap();
        ResolvedArtifact {
            group_id: group.to_string(),
            artifact_id: artifact.to_string(),
            version: version.to_string(),
            file: PathBuf::from(format!("/repo/{artifact}-{version}.jar")),
        }
    }

    #[test]
    fn parse_coordinates() {
        let c = Coordinates::parse("org.junit.platform:junit-platform-launcher:1.3.1").unwrap();
        assert_eq!(c.group, "org.junit.platform");
        assert_eq!(c.artifact, "junit-platform-launcher");
        assert_eq!(c.version.as_deref(), Some("1.3.1"));
        assert_eq!(c.to_string(), "org.junit.platform:junit-platform-launcher:1.3.1");

        let c = Coordinates::parse("junit:junit").unwrap();
        assert_eq!(c.version, None);
        assert_eq!(c.identifier(), "junit:junit");
    }

    #[test]
    fn parse_rejects_malformed_coordinates() {
        for input in ["", "junit", "a::b", "a:b:c:d", ":b:1"] {
            assert!(
                matches!(Coordinates::parse(input), Err(ResolutionError::InvalidCoordinates(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn static_resolver_falls_back_to_identifier() {
        let mut resolver = StaticResolver::default();
        resolver.insert("a:b", vec![artifact("a:b", "2")]);
        let resolved = resolver.resolve(&Coordinates::parse("a:b:2").unwrap(), "runtime").unwrap();
        assert_eq!(resolved.len(), 1);
        assert!(resolver.resolve(&Coordinates::parse("x:y:1").unwrap(), "runtime").unwrap().is_empty());
    }

    #[test]
    fn local_repository_layout() {
        let temp = tempfile::TempDir::new().unwrap();
        let jar = temp.path().join("org/junit/platform/junit-platform-launcher/1.3.1/junit-platform-launcher-1.3.1.jar");
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        std::fs::write(&jar, b"").unwrap();

        let resolver = LocalRepositoryResolver::new(temp.path());
        let coordinates = Coordinates::parse("org.junit.platform:junit-platform-launcher:1.3.1").unwrap();
        let resolved = resolver.resolve(&coordinates, "runtime").unwrap();
        assert_eq!(resolved[0].file, jar);

        let missing = Coordinates::parse("org.junit.platform:junit-platform-launcher:9.9.9").unwrap();
        assert!(resolver.resolve(&missing, "runtime").unwrap().is_empty());

        let unversioned = Coordinates::parse("org.junit.platform:junit-platform-launcher").unwrap();
        assert!(matches!(
            resolver.resolve(&unversioned, "runtime"),
            Err(ResolutionError::MissingVersion(_))
        ));
    }

    #[test]
    fn chain_takes_first_non_empty_answer() {
        let mut first = StaticResolver::default();
        first.insert("a:b:1", Vec::new());
        let mut second = StaticResolver::default();
        second.insert("a:b:1", vec![artifact("a:b", "1")]);
        let mut third = StaticResolver::default();
        third.insert("a:b:1", vec![artifact("a:b", "1"), artifact("c:d", "1")]);

        let chain = ChainResolver::new().with(first).with(second).with(third);
        let resolved = chain.resolve(&Coordinates::parse("a:b:1").unwrap(), "runtime").unwrap();
        assert_eq!(resolved.len(), 1);
    }
}
