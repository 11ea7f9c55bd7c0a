//! Build the forked JVM command line.
//!
//! ## Shape
//!
//! ```text
//! java [additional options] [-enableassertions] -Dfile.encoding=E
//!      ( --module-path P --add-modules M [--patch-module N=dir [--add-reads N=M]* [--add-opens N/pkg=M]*]
//!        --module org.junit.platform.console
//!      | -classpath P org.junit.platform.console.ConsoleLauncher )
//!      --disable-ansi-colors --details tree [--details-theme T] [--fail-if-no-tests] [--reports-dir D]
//!      [--include-tag=T]* [--include-classname=P]* [--config=K=V]*
//!      (explicit selectors | --select-module NAME | --scan-class-path)
//! ```
//!
//! Either option segment is replaced wholesale by its override list when one is configured.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use junit_launch_core::TestMode;
use junit_launch_core::artifacts::{PATCH_OPENS_TARGET, PATCH_READ_TARGETS};
use junit_launch_modules::ModuleDescriptor;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{Configuration, JavaOptions, Selectors};
use crate::layering::PathLayering;
use crate::project::ProjectModel;
use crate::world::ModularWorld;

pub const CONSOLE_MODULE: &str = "org.junit.platform.console";
pub const CONSOLE_LAUNCHER_CLASS: &str = "org.junit.platform.console.ConsoleLauncher";
/// Per-project patch directives, one per line.
pub const MODULE_INFO_TEST: &str = "module-info.test";
pub const PATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

#[derive(Debug, Error, Diagnostic)]
pub enum CommandError {
    #[error("test mode {mode} needs a {role} module name, but none was classified")]
    #[diagnostic(
        code(junit_launch::command::module_name),
        help("set javaOptions.addModules, or check the compiled module-info.class of the {role} output")
    )]
    MissingModuleName { mode: TestMode, role: &'static str },

    #[error("failed to read patch directives {}", path.display())]
    #[diagnostic(code(junit_launch::command::patch))]
    PatchConfiguration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Launcher options
// ============================================================================

/// What the launcher is asked to discover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Selection {
    /// Explicitly configured selectors.
    Explicit(Selectors),
    /// Every test of a module.
    Module(String),
    /// Every test found under these roots; empty means every class path root.
    ClassPathRoots(Vec<PathBuf>),
}

impl Selection {
    /// Explicit selectors win; otherwise the mode's selected module, otherwise a class path scan.
    pub fn derive(selectors: &Selectors, world: &ModularWorld) -> Self {
        if !selectors.is_empty() {
            return Selection::Explicit(selectors.clone());
        }
        match world.selected_module() {
            Some(module) => Selection::Module(module.to_string()),
            None => Selection::ClassPathRoots(Vec::new()),
        }
    }

    pub fn to_arguments(&self) -> Vec<String> {
        match self {
            Selection::Explicit(selectors) => selectors
                .groups()
                .into_iter()
                .flat_map(|(option, values)| values.iter().flat_map(move |value| [option.to_string(), value.clone()]))
                .collect(),
            Selection::Module(module) => vec!["--select-module".to_string(), module.clone()],
            Selection::ClassPathRoots(roots) if roots.is_empty() => vec!["--scan-class-path".to_string()],
            Selection::ClassPathRoots(roots) => vec![format!("--scan-class-path={}", join_paths(roots.iter()))],
        }
    }
}

/// Console launcher options: output format, reports, filters, parameters and selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleOptions {
    pub details: String,
    pub details_theme: Option<String>,
    pub fail_if_no_tests: bool,
    pub reports_dir: Option<PathBuf>,
    pub tags: Vec<String>,
    pub class_name_patterns: Vec<String>,
    pub parameters: BTreeMap<String, String>,
    pub selection: Selection,
}

impl ConsoleOptions {
    pub fn new(configuration: &Configuration, project: &ProjectModel, world: &ModularWorld) -> Self {
        Self {
            details: configuration.launcher.details.clone(),
            details_theme: configuration.launcher.details_theme.clone(),
            fail_if_no_tests: configuration.fail_if_no_tests(),
            reports_dir: configuration.reports_directory(project),
            tags: configuration.tags.clone(),
            class_name_patterns: configuration.class_name_patterns.clone(),
            parameters: configuration.parameters.clone(),
            selection: Selection::derive(&configuration.selectors, world),
        }
    }

    pub fn to_arguments(&self) -> Vec<String> {
        let mut args = vec!["--disable-ansi-colors".to_string(), "--details".to_string(), self.details.clone()];
        if let Some(theme) = &self.details_theme {
            args.push("--details-theme".to_string());
            args.push(theme.clone());
        }
        if self.fail_if_no_tests {
            args.push("--fail-if-no-tests".to_string());
        }
        if let Some(reports) = &self.reports_dir {
            args.push("--reports-dir".to_string());
            args.push(reports.display().to_string());
        }
        args.extend(self.tags.iter().map(|tag| format!("--include-tag={tag}")));
        args.extend(self.class_name_patterns.iter().map(|p| format!("--include-classname={p}")));
        // BTreeMap iteration keeps keys sorted
        args.extend(self.parameters.iter().map(|(key, value)| format!("--config={key}={value}")));
        args.extend(self.selection.to_arguments());
        args
    }
}

// ============================================================================
// Command line
// ============================================================================

/// Join paths with the platform path separator.
pub fn join_paths<'p>(paths: impl IntoIterator<Item = &'p PathBuf>) -> String {
    paths
        .into_iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

pub struct CommandLineBuilder<'a> {
    world: &'a ModularWorld,
    layering: &'a PathLayering,
    configuration: &'a Configuration,
    project: &'a ProjectModel,
}

impl<'a> CommandLineBuilder<'a> {
    pub fn new(
        world: &'a ModularWorld,
        layering: &'a PathLayering,
        configuration: &'a Configuration,
        project: &'a ProjectModel,
    ) -> Self {
        Self {
            world,
            layering,
            configuration,
            project,
        }
    }

    /// Build the argument vector, `java` executable first.
    #[tracing::instrument(skip_all, fields(mode = %self.world.mode))]
    pub fn build(&self) -> Result<Vec<String>, CommandError> {
        let options = &self.configuration.java_options;
        let mut cmd = vec![self.configuration.java_executable().display().to_string()];

        if options.override_java_options.is_empty() {
            self.add_java_options(&mut cmd)?;
        } else {
            cmd.extend(options.override_java_options.iter().cloned());
        }

        if options.override_launcher_options.is_empty() {
            cmd.extend(ConsoleOptions::new(self.configuration, self.project, self.world).to_arguments());
        } else {
            cmd.extend(options.override_launcher_options.iter().cloned());
        }
        debug!(arguments = cmd.len(), "command line built");
        Ok(cmd)
    }

    fn add_java_options(&self, cmd: &mut Vec<String>) -> Result<(), CommandError> {
        let options = &self.configuration.java_options;
        cmd.extend(options.additional_options.iter().cloned());
        if self.configuration.tweaks.default_assertion_status {
            cmd.push("-enableassertions".to_string());
        }
        cmd.push(format!("-Dfile.encoding={}", options.encoding));

        let path = join_paths(self.layering.all_paths());
        let mode = self.world.mode;
        if !mode.is_modular() {
            cmd.push("-classpath".to_string());
            cmd.push(path);
            cmd.push(CONSOLE_LAUNCHER_CLASS.to_string());
            return Ok(());
        }

        cmd.push("--module-path".to_string());
        cmd.push(path);
        cmd.push("--add-modules".to_string());
        cmd.push(self.add_modules_argument()?);
        if mode.requires_patching() {
            let main = self.world.main.as_ref().ok_or(CommandError::MissingModuleName { mode, role: "main" })?;
            cmd.extend(patch_arguments(main, self.project, options)?);
        }
        cmd.push("--module".to_string());
        cmd.push(CONSOLE_MODULE.to_string());
        Ok(())
    }

    fn add_modules_argument(&self) -> Result<String, CommandError> {
        if let Some(value) = self.configuration.java_options.add_modules.as_ref().filter(|v| !v.trim().is_empty()) {
            return Ok(value.clone());
        }
        let mode = self.world.mode;
        self.world.root_module().map(str::to_string).ok_or(CommandError::MissingModuleName {
            mode,
            role: if mode.requires_patching() { "main" } else { "test" },
        })
    }
}

/// Patch test classes into the main module at runtime.
///
/// ## Returns
/// - `--patch-module main=<test output>`, followed by either the directives of a `module-info.test` file (test
///   output directory first, then `src/test/java`), or derived `--add-reads` and per-package `--add-opens`.
///
/// ## Notes
/// - Packages are opened one by one: the module system has no "open every package" directive on the command line.
pub fn patch_arguments(
    main: &ModuleDescriptor,
    project: &ProjectModel,
    options: &JavaOptions,
) -> Result<Vec<String>, CommandError> {
    let name = &main.name;
    let mut args = vec![
        "--patch-module".to_string(),
        format!("{name}={}", project.test_output_directory.display()),
    ];

    if let Some(path) = find_patch_configuration(project) {
        let text = fs::read_to_string(&path).map_err(|source| CommandError::PatchConfiguration {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "applying patch directives");
        args.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with("//"))
                .map(str::to_string),
        );
        return Ok(args);
    }

    let reads: Vec<String> = match &options.add_reads {
        Some(reads) => reads.clone(),
        None => PATCH_READ_TARGETS
            .iter()
            .filter(|artifact| project.contains(**artifact))
            .filter_map(|artifact| artifact.module())
            .map(str::to_string)
            .collect(),
    };
    for module in reads {
        args.push("--add-reads".to_string());
        args.push(format!("{name}={module}"));
    }

    let opens: Vec<String> = match &options.add_opens {
        Some(opens) => opens.clone(),
        None => vec![PATCH_OPENS_TARGET.to_string()],
    };
    for module in &opens {
        for package in &main.packages {
            args.push("--add-opens".to_string());
            args.push(format!("{name}/{package}={module}"));
        }
    }
    Ok(args)
}

fn find_patch_configuration(project: &ProjectModel) -> Option<PathBuf> {
    [
        project.test_output_directory.join(MODULE_INFO_TEST),
        project.base_directory.join("src").join("test").join("java").join(MODULE_INFO_TEST),
    ]
    .into_iter()
    .find(|path| path.is_file())
}

/// Render a command line for logs: one argument per line, path lists split one element per line.
pub fn describe(cmd: &[String]) -> String {
    cmd.iter()
        .map(|arg| {
            if !arg.starts_with('-') && arg.contains(PATH_SEPARATOR) {
                arg.split(PATH_SEPARATOR).collect::<Vec<_>>().join(&format!("{PATH_SEPARATOR}\n  "))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_selection_lists_every_selector() {
        let mut selectors = Selectors::default();
        selectors.classes.insert("a.FooTests".to_string());
        selectors.packages.insert("b".to_string());
        let args = Selection::Explicit(selectors).to_arguments();
        assert_eq!(args, vec!["--select-package", "b", "--select-class", "a.FooTests"]);
    }

    #[test]
    fn class_path_scan_with_roots() {
        let roots = vec![PathBuf::from("/p/test-classes")];
        assert_eq!(
            Selection::ClassPathRoots(roots).to_arguments(),
            vec!["--scan-class-path=/p/test-classes".to_string()]
        );
    }

    #[test]
    fn parameters_are_sorted() {
        let options = ConsoleOptions {
            details: "tree".into(),
            details_theme: Some("ascii".into()),
            fail_if_no_tests: false,
            reports_dir: None,
            tags: vec!["fast".into()],
            class_name_patterns: Vec::new(),
            parameters: BTreeMap::from([("z".to_string(), "1".to_string()), ("a".to_string(), "2".to_string())]),
            selection: Selection::Module("app".into()),
        };
        assert_eq!(
            options.to_arguments(),
            vec![
                "--disable-ansi-colors",
                "--details",
                "tree",
                "--details-theme",
                "ascii",
                "--include-tag=fast",
                "--config=a=2",
                "--config=z=1",
                "--select-module",
                "app",
            ]
        );
    }
}
