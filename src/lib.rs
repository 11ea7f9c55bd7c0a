//! Launch the JUnit Platform against classic and modular Java projects.
//!
//! A run is a strict pipeline: the compiled main and test output is classified into modules, the pair of module
//! names picks a [`TestMode`], the project's class path is split into isolated path layers, and the tests are run
//! either in a forked JVM driven by the console launcher or in-process behind a layered loader chain.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. Every module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//! - **Worker panics**: a panic raised by an in-process test engine host is resumed on the caller with its original
//!   payload, never converted into an error value.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod execution;
pub mod layering;
pub mod project;
pub mod resolver;
pub mod runner;
pub mod version;
pub mod world;

pub use junit_launch_core::{ExecutorKind, Isolation, LayerName, TestBarrier, TestMode, codes};
pub use junit_launch_modules::{ModuleDescriptor, classify};

pub use config::{Configuration, ConfigurationBuilder};
pub use error::LaunchError;
pub use layering::{PathLayering, PathSet, Precedence};
pub use project::ProjectModel;
pub use runner::{RunReport, Runner};
pub use world::ModularWorld;
