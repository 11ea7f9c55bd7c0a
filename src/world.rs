//! The classified pair of main and test output, and the test mode it implies.

use std::fmt;

use junit_launch_core::{TestBarrier, TestMode};
use junit_launch_modules::{ClassifyError, ModuleDescriptor, classify};
use tracing::info;

use crate::project::ProjectModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModularWorld {
    pub main: Option<ModuleDescriptor>,
    pub test: Option<ModuleDescriptor>,
    pub mode: TestMode,
}

impl ModularWorld {
    /// Classify the project's main and test output directories.
    ///
    /// ## Errors
    /// - [`ClassifyError::AmbiguousModule`] when either directory holds more than one module.
    #[tracing::instrument(skip_all)]
    pub fn classify(project: &ProjectModel) -> Result<Self, ClassifyError> {
        let main = classify(&project.output_directory)?;
        let test = classify(&project.test_output_directory)?;
        let world = Self::new(main, test);
        info!(
            main = world.main_name().unwrap_or("-"),
            test = world.test_name().unwrap_or("-"),
            mode = %world.mode,
            "classified project"
        );
        Ok(world)
    }

    pub fn new(main: Option<ModuleDescriptor>, test: Option<ModuleDescriptor>) -> Self {
        let mode = TestMode::resolve(
            main.as_ref().map(|m| m.name.as_str()),
            test.as_ref().map(|t| t.name.as_str()),
        );
        Self { main, test, mode }
    }

    pub fn main_name(&self) -> Option<&str> {
        self.main.as_ref().map(|m| m.name.as_str())
    }

    pub fn test_name(&self) -> Option<&str> {
        self.test.as_ref().map(|t| t.name.as_str())
    }

    pub fn barrier(&self) -> TestBarrier {
        self.mode.barrier()
    }

    /// Root module of the module graph (`--add-modules`), if the mode runs on the module path.
    pub fn root_module(&self) -> Option<&str> {
        self.mode.root_module(self.main_name(), self.test_name())
    }

    /// Module whose tests are selected when no explicit selector is configured.
    pub fn selected_module(&self) -> Option<&str> {
        self.mode.selected_module(self.main_name(), self.test_name())
    }
}

impl fmt::Display for ModularWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |module: &Option<ModuleDescriptor>| match module {
            Some(descriptor) => descriptor.to_string(),
            None => "-".to_string(),
        };
        writeln!(f, "main: {}", describe(&self.main))?;
        writeln!(f, "test: {}", describe(&self.test))?;
        write!(f, "mode: {}", self.mode)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn module(name: &str) -> ModuleDescriptor {
        ModuleDescriptor {
            name: name.to_string(),
            packages: BTreeSet::from([name.to_string()]),
            is_open: false,
            is_automatic: false,
            requires: Vec::new(),
        }
    }

    #[test]
    fn mode_follows_module_names() {
        assert_eq!(ModularWorld::new(None, None).mode, TestMode::Classic);
        assert_eq!(ModularWorld::new(Some(module("app")), None).mode, TestMode::MainModuleTestClassic);
        assert_eq!(
            ModularWorld::new(Some(module("app")), Some(module("app"))).mode,
            TestMode::MainModuleTestModuleSameName
        );
        assert_eq!(ModularWorld::new(Some(module("app")), Some(module("it"))).mode, TestMode::Modular);
    }

    #[test]
    fn classify_missing_directories_is_classic() {
        let temp = tempfile::TempDir::new().unwrap();
        let project = ProjectModel::conventional(temp.path());
        let world = ModularWorld::classify(&project).unwrap();
        assert_eq!(world.mode, TestMode::Classic);
        assert_eq!(world.selected_module(), None);
    }

    #[test]
    fn display_lists_both_sides() {
        let world = ModularWorld::new(Some(module("app")), None);
        assert_eq!(
            world.to_string(),
            "main: module app\ntest: -\nmode: MAIN_MODULE_TEST_CLASSIC [barrier=PACKAGE]"
        );
    }
}
