//! Path layering: split the project's paths into isolated, duplicate-free layers.
//!
//! ## Algorithm
//!
//! 1. Seed `main` with the compile class path and `test` with the test class path minus `main` (and minus the test
//!    engine jars when they move to `launcher`).
//! 2. Add configured raw path elements, then configured extra dependencies, to `test` and `launcher`.
//! 3. Resolve missing runtime components into `launcher` and `isolator`, in a fixed order: launcher, reporting,
//!    console, Jupiter engine, Vintage engine, isolation worker.
//! 4. Remove excluded artifacts from every layer.
//! 5. Fold the layers according to the [`Isolation`] level.
//! 6. Prune cross-layer duplicates by [`Precedence`] and drop empty layers (`all` always stays).

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use junit_launch_core::artifacts::GroupArtifact;
use junit_launch_core::isolation::DEFAULT_PRECEDENCE;
use junit_launch_core::{ExecutorKind, Isolation, LayerName, VersionKey};
use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Tweaks;
use crate::project::{ProjectModel, Versions, compare_versions};
use crate::resolver::{ArtifactResolver, Coordinates, ResolutionError};

/// Platform version from which the reporting artifact exists.
const REPORTING_SINCE: &str = "1.4.0-M1";

#[derive(Debug, Error, Diagnostic)]
pub enum LayeringError {
    #[error("resolving `{coordinates}` for the {layer} layer failed")]
    #[diagnostic(code(junit_launch::layering::resolution))]
    Resolution {
        layer: LayerName,
        coordinates: String,
        #[source]
        #[diagnostic_source]
        source: ResolutionError,
    },

    #[error("runtime component `{coordinates}` for the {layer} layer is unavailable")]
    #[diagnostic(
        code(junit_launch::layering::unavailable),
        help("make the artifact available in the local repository or in the project model's resolved closures")
    )]
    RuntimeUnavailable { layer: LayerName, coordinates: String },
}

// ============================================================================
// Path sets and layerings
// ============================================================================

/// Insertion-ordered set of paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSet(Vec<PathBuf>);

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path; returns `false` when it was already present.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.0.push(path);
        true
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.0.len();
        self.0.retain(|p| p != path);
        self.0.len() != before
    }

    pub fn retain(&mut self, keep: impl FnMut(&PathBuf) -> bool) {
        self.0.retain(keep);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.iter().any(|p| p == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<PathBuf>> Extend<P> for PathSet {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        for path in iter {
            self.insert(path);
        }
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for PathSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set = PathSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a PathSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Named path layers, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathLayering {
    layers: Vec<(LayerName, PathSet)>,
}

impl PathLayering {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer, or merge into an existing layer of the same name.
    pub fn push(&mut self, name: LayerName, paths: PathSet) {
        match self.get_mut(name) {
            Some(existing) => existing.extend(paths.iter().cloned()),
            None => self.layers.push((name, paths)),
        }
    }

    pub fn get(&self, name: LayerName) -> Option<&PathSet> {
        self.layers.iter().find(|(n, _)| *n == name).map(|(_, paths)| paths)
    }

    pub fn get_mut(&mut self, name: LayerName) -> Option<&mut PathSet> {
        self.layers.iter_mut().find(|(n, _)| *n == name).map(|(_, paths)| paths)
    }

    pub fn names(&self) -> Vec<LayerName> {
        self.layers.iter().map(|(name, _)| *name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LayerName, &PathSet)> {
        self.layers.iter().map(|(name, paths)| (*name, paths))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Every path of every layer, in layer order.
    pub fn all_paths(&self) -> Vec<&PathBuf> {
        self.layers.iter().flat_map(|(_, paths)| paths.iter()).collect()
    }

    /// Drop empty layers, keeping `all` even when empty.
    pub fn drop_empty(&mut self) {
        self.layers.retain(|(name, paths)| *name == LayerName::All || !paths.is_empty());
    }
}

impl fmt::Display for PathLayering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, paths) in &self.layers {
            writeln!(f, "{name} ({})", paths.len())?;
            for path in paths {
                writeln!(f, "  {}", path.display())?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Pruning
// ============================================================================

/// Ownership order for duplicate paths: a path kept by an earlier layer is removed from every later one.
///
/// ## Notes
/// - Layers not named in the list rank after all named ones, in their insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precedence(Vec<LayerName>);

impl Default for Precedence {
    fn default() -> Self {
        Self(DEFAULT_PRECEDENCE.to_vec())
    }
}

impl Precedence {
    pub fn new(layers: Vec<LayerName>) -> Self {
        Self(layers)
    }

    fn rank(&self, name: LayerName) -> Option<usize> {
        self.0.iter().position(|n| *n == name)
    }
}

/// Remove from every layer the paths owned by a layer of higher precedence.
///
/// ## Notes
/// - Layer order and the order of paths inside a layer are preserved.
/// - Idempotent; afterwards the layers are pairwise disjoint.
pub fn prune_duplicates(layering: &mut PathLayering, precedence: &Precedence) {
    let mut order: Vec<usize> = (0..layering.layers.len()).collect();
    // stable: unranked layers keep their insertion order after the ranked ones
    order.sort_by_key(|&index| precedence.rank(layering.layers[index].0).unwrap_or(usize::MAX));

    let mut owned: BTreeSet<PathBuf> = BTreeSet::new();
    for index in order {
        let (name, paths) = &mut layering.layers[index];
        let before = paths.len();
        paths.retain(|path| !owned.contains(path));
        if paths.len() != before {
            debug!(layer = %name, pruned = before - paths.len(), "pruned duplicate paths");
        }
        owned.extend(paths.iter().cloned());
    }
}

// ============================================================================
// Layering engine
// ============================================================================

/// Runtime components the execution strategy needs on top of the project's own paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeComponents {
    pub console: bool,
    pub worker: bool,
}

impl RuntimeComponents {
    pub fn for_executor(executor: ExecutorKind) -> Self {
        Self {
            console: executor.injects_console(),
            worker: executor.injects_worker(),
        }
    }
}

/// Builds a [`PathLayering`] for one project.
pub struct PathLayeringEngine<'a> {
    project: &'a ProjectModel,
    versions: &'a Versions,
    resolver: &'a dyn ArtifactResolver,
}

/// Per-build bookkeeping: the layers under construction plus everything resolved so far.
struct Layers {
    main: PathSet,
    test: PathSet,
    launcher: PathSet,
    isolator: PathSet,
    /// `group:artifact` identifiers resolved by earlier steps.
    resolved: BTreeSet<String>,
    /// Files of resolved artifacts, by identifier, for excludes.
    files: Vec<(String, PathBuf)>,
}

impl Layers {
    fn layer_mut(&mut self, name: LayerName) -> &mut PathSet {
        match name {
            LayerName::Main => &mut self.main,
            LayerName::Test => &mut self.test,
            LayerName::Isolator => &mut self.isolator,
            _ => &mut self.launcher,
        }
    }
}

impl<'a> PathLayeringEngine<'a> {
    pub fn new(project: &'a ProjectModel, versions: &'a Versions, resolver: &'a dyn ArtifactResolver) -> Self {
        Self {
            project,
            versions,
            resolver,
        }
    }

    /// Build the layering.
    ///
    /// ## Errors
    /// - [`LayeringError::Resolution`] when the resolver fails; fatal, never retried.
    /// - [`LayeringError::RuntimeUnavailable`] when a required runtime component resolves to nothing.
    #[tracing::instrument(skip_all, fields(isolation = %isolation))]
    pub fn build(
        &self,
        tweaks: &Tweaks,
        isolation: Isolation,
        components: RuntimeComponents,
        precedence: &Precedence,
    ) -> Result<PathLayering, LayeringError> {
        let project = self.project;
        let mut layers = Layers {
            main: project.compile_classpath.iter().cloned().collect(),
            test: PathSet::new(),
            launcher: PathSet::new(),
            isolator: PathSet::new(),
            resolved: BTreeSet::new(),
            files: Vec::new(),
        };

        let mut test_excludes: PathSet = project.compile_classpath.iter().cloned().collect();
        if tweaks.move_test_engines_to_launcher_class_loader {
            for id in [GroupArtifact::Jupiter, GroupArtifact::JupiterEngine, GroupArtifact::PlatformEngine] {
                if let Some(file) = project.locate(&id.identifier()) {
                    test_excludes.insert(file);
                }
            }
        }
        layers.test = project
            .test_classpath
            .iter()
            .filter(|path| !test_excludes.contains(path))
            .cloned()
            .collect();

        layers.test.extend(tweaks.additional_test_path_elements.iter().cloned());
        layers.launcher.extend(tweaks.additional_launcher_path_elements.iter().cloned());

        for coordinates in &tweaks.additional_test_dependencies {
            self.resolve_into(&mut layers, LayerName::Test, coordinates)?;
        }
        for coordinates in &tweaks.additional_launcher_dependencies {
            self.resolve_into(&mut layers, LayerName::Launcher, coordinates)?;
        }

        self.resolve_runtime(&mut layers, tweaks, components)?;
        self.remove_excludes(&mut layers, &tweaks.dependency_excludes);

        let mut layering = fold(layers, isolation, &project.output_directory);
        prune_duplicates(&mut layering, precedence);
        layering.drop_empty();
        info!(layers = ?layering.names(), paths = layering.all_paths().len(), "path layering built");
        Ok(layering)
    }

    fn resolve_runtime(
        &self,
        layers: &mut Layers,
        tweaks: &Tweaks,
        components: RuntimeComponents,
    ) -> Result<(), LayeringError> {
        let project = self.project;
        self.require(layers, LayerName::Launcher, GroupArtifact::PlatformLauncher, true)?;

        let platform = self.versions.get(VersionKey::Platform);
        if compare_versions(platform, REPORTING_SINCE).is_ge() {
            self.require(layers, LayerName::Launcher, GroupArtifact::PlatformReporting, true)?;
        } else {
            debug!(platform, "platform predates the reporting artifact");
        }

        if components.console {
            self.require(layers, LayerName::Launcher, GroupArtifact::PlatformConsole, true)?;
        }

        if project.contains(GroupArtifact::JupiterApi) {
            self.require(layers, LayerName::Launcher, GroupArtifact::JupiterEngine, true)?;
            if tweaks.move_test_engines_to_launcher_class_loader {
                self.require(layers, LayerName::Launcher, GroupArtifact::JupiterEngine, false)?;
            }
        }

        if project.contains(GroupArtifact::Junit4) {
            self.require(layers, LayerName::Launcher, GroupArtifact::VintageEngine, true)?;
        }

        if components.worker {
            self.require(layers, LayerName::Isolator, GroupArtifact::IsolatorWorker, true)?;
        }
        Ok(())
    }

    /// Resolve a registry artifact into a layer unless it is already present.
    ///
    /// `skip_if_in_project` is false only for engines forced into `launcher`: they are in the project, but were
    /// kept out of `test`.
    fn require(
        &self,
        layers: &mut Layers,
        layer: LayerName,
        artifact: GroupArtifact,
        skip_if_in_project: bool,
    ) -> Result<(), LayeringError> {
        let identifier = artifact.identifier();
        if skip_if_in_project && self.project.contains(artifact) {
            debug!(artifact = %identifier, "skip resolving, already present in project");
            return Ok(());
        }
        if layers.resolved.contains(&identifier) {
            debug!(artifact = %identifier, "skip resolving, already resolved");
            return Ok(());
        }
        let coordinates = self.versions.coordinates(artifact);
        let added = self.resolve_into(layers, layer, &coordinates)?;
        if added == 0 {
            return Err(LayeringError::RuntimeUnavailable { layer, coordinates });
        }
        Ok(())
    }

    /// Resolve coordinates and add every file of the closure to a layer; returns the closure size.
    fn resolve_into(&self, layers: &mut Layers, layer: LayerName, coordinates: &str) -> Result<usize, LayeringError> {
        let wrap = |source| LayeringError::Resolution {
            layer,
            coordinates: coordinates.to_string(),
            source,
        };
        let parsed = Coordinates::parse(coordinates).map_err(wrap)?;
        let closure = self.resolver.resolve(&parsed, "runtime").map_err(wrap)?;
        debug!(%layer, %coordinates, artifacts = closure.len(), "resolved");
        for artifact in &closure {
            layers.resolved.insert(artifact.identifier());
            layers.files.push((artifact.identifier(), artifact.file.clone()));
            layers.layer_mut(layer).insert(artifact.file.clone());
        }
        Ok(closure.len())
    }

    fn remove_excludes(&self, layers: &mut Layers, excludes: &[String]) {
        for exclude in excludes {
            let mut files: Vec<PathBuf> = layers
                .files
                .iter()
                .filter(|(id, _)| id == exclude)
                .map(|(_, file)| file.clone())
                .collect();
            files.extend(self.project.locate(exclude).map(Path::to_path_buf));
            for file in files {
                for layer in [&mut layers.main, &mut layers.test, &mut layers.launcher, &mut layers.isolator] {
                    if layer.remove(&file) {
                        debug!(artifact = %exclude, file = %file.display(), "excluded");
                    }
                }
            }
        }
    }
}

/// Fold the four base layers according to the isolation level.
fn fold(layers: Layers, isolation: Isolation, main_output: &Path) -> PathLayering {
    let Layers {
        mut main,
        mut test,
        launcher,
        isolator,
        ..
    } = layers;
    let mut layering = PathLayering::new();
    match isolation {
        Isolation::Absolute | Isolation::Almost => {
            if isolation == Isolation::Almost && main.remove(main_output) {
                test.insert(main_output);
            }
            layering.push(LayerName::Main, main);
            layering.push(LayerName::Test, test);
            layering.push(LayerName::Launcher, launcher);
            layering.push(LayerName::Isolator, isolator);
        }
        Isolation::Merged => {
            let mut merged = test;
            merged.extend(main.iter().cloned());
            layering.push(LayerName::Merged, merged);
            layering.push(LayerName::Launcher, launcher);
            layering.push(LayerName::Isolator, isolator);
        }
        Isolation::None => {
            let mut all = main;
            for layer in [test, launcher, isolator] {
                all.extend(layer.iter().cloned());
            }
            layering.push(LayerName::All, all);
        }
    }
    layering
}
