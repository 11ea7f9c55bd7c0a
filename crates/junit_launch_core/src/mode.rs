//! Test-run modes.
//!
//! A mode is defined by the relation of one `main` and one `test` module name:
//!
//! ```text
//!                          main plain    main module   main module
//!                             ---            foo           bar
//!
//!     test plain  ---          0              2             2
//!     test module foo          1              3             4
//!     test module bar          1              4             3
//!
//!     0 = CLASSIC
//!     1 = MAIN_CLASSIC_TEST_MODULE           (black-box)
//!     2 = MAIN_MODULE_TEST_CLASSIC           (white-box, patched at runtime)
//!     3 = MAIN_MODULE_TEST_MODULE_SAME_NAME  (white-box)
//!     4 = MODULAR                            (black-box)
//! ```

use std::fmt;

/// Accessibility barrier implied by a test mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestBarrier {
    /// White-box: tests share the package of the code under test and see internal types.
    Package,
    /// Black-box: tests only see the exported API of the module under test.
    Module,
}

impl TestBarrier {
    pub fn as_str(self) -> &'static str {
        match self {
            TestBarrier::Package => "PACKAGE",
            TestBarrier::Module => "MODULE",
        }
    }
}

impl fmt::Display for TestBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test-run mode derived from the main and test module names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestMode {
    /// No modules at all, fall back to the class path.
    Classic,
    /// Main module absent, test module present.
    ///
    /// Also selected when there is no main artifact at all, i.e. main is empty.
    MainClassicTestModule,
    /// Main module present, test module absent.
    ///
    /// Tests are patched into the main module at test runtime, by-passing the module barrier on purpose.
    MainModuleTestClassic,
    /// Main and test module present, with the **same** name.
    ///
    /// Main types were patched into the test module at test-compile time.
    MainModuleTestModuleSameName,
    /// Main and test module present, with **different** names. No patching involved.
    Modular,
}

/// All modes, in table order.
pub const ALL_MODES: &[TestMode] = &[
    TestMode::Classic,
    TestMode::MainClassicTestModule,
    TestMode::MainModuleTestClassic,
    TestMode::MainModuleTestModuleSameName,
    TestMode::Modular,
];

impl TestMode {
    /// Resolve the test mode from two optional module names.
    ///
    /// ## Parameters
    /// - `main`: name of the main module, if the main output declares one.
    /// - `test`: name of the test module, if the test output declares one.
    ///
    /// ## Returns
    /// - (`TestMode`): one of the five modes; same inputs always yield the same mode.
    ///
    /// ## Notes
    /// - Empty or whitespace-only names count as absent: a module name is never legitimately blank.
    /// - Names are compared exactly (case-sensitive).
    pub fn resolve(main: Option<&str>, test: Option<&str>) -> TestMode {
        let main = main.filter(|name| !name.trim().is_empty());
        let test = test.filter(|name| !name.trim().is_empty());
        match (main, test) {
            (None, None) => TestMode::Classic,
            (None, Some(_)) => TestMode::MainClassicTestModule,
            (Some(_), None) => TestMode::MainModuleTestClassic,
            (Some(main), Some(test)) if main == test => TestMode::MainModuleTestModuleSameName,
            (Some(_), Some(_)) => TestMode::Modular,
        }
    }

    /// Return the accessibility barrier implied by this mode.
    pub fn barrier(self) -> TestBarrier {
        match self {
            TestMode::Classic | TestMode::MainModuleTestClassic | TestMode::MainModuleTestModuleSameName => {
                TestBarrier::Package
            }
            TestMode::MainClassicTestModule | TestMode::Modular => TestBarrier::Module,
        }
    }

    /// Whether the forked JVM runs on the module path.
    pub fn is_modular(self) -> bool {
        !matches!(self, TestMode::Classic)
    }

    /// Whether test classes must be patched into the main module at runtime.
    pub fn requires_patching(self) -> bool {
        matches!(self, TestMode::MainModuleTestClassic)
    }

    /// Pick the root module passed to `--add-modules`.
    ///
    /// ## Returns
    /// - The main module name for [`TestMode::MainModuleTestClassic`], the test module name for every other modular
    ///   mode, and `None` for [`TestMode::Classic`] or when the expected name is missing.
    pub fn root_module<'a>(self, main: Option<&'a str>, test: Option<&'a str>) -> Option<&'a str> {
        match self {
            TestMode::Classic => None,
            TestMode::MainModuleTestClassic => main,
            _ => test,
        }
    }

    /// Pick the module whose tests are selected, preferring the test module over the main module.
    pub fn selected_module<'a>(self, main: Option<&'a str>, test: Option<&'a str>) -> Option<&'a str> {
        match self {
            TestMode::Classic => None,
            _ => test.or(main),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestMode::Classic => "CLASSIC",
            TestMode::MainClassicTestModule => "MAIN_CLASSIC_TEST_MODULE",
            TestMode::MainModuleTestClassic => "MAIN_MODULE_TEST_CLASSIC",
            TestMode::MainModuleTestModuleSameName => "MAIN_MODULE_TEST_MODULE_SAME_NAME",
            TestMode::Modular => "MODULAR",
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [barrier={}]", self.as_str(), self.barrier())
    }
}
