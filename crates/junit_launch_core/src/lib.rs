//! Provide the shared, pure vocabulary of `junit-launch`.
//!
//! Everything in here is a closed set of values plus small lookup tables: the five test modes and their
//! accessibility barriers, isolation levels and the path layers they produce, executor kinds, the JUnit
//! group/artifact registry with default versions, and the result codes reported by a run.
//!
//! ## Notes
//!
//! - This is a "vocabulary" crate: **no IO**, no global state, no dependencies.
//! - Behaviour attached to each enum lives in separate pure functions/methods so each concern (barrier kind,
//!   layering strategy, command-line shape) can be tested on its own.
//!
//! ## Examples
//! ```rust
//! use junit_launch_core::mode::{TestBarrier, TestMode};
//!
//! let mode = TestMode::resolve(Some("app"), None);
//! assert_eq!(mode, TestMode::MainModuleTestClassic);
//! assert_eq!(mode.barrier(), TestBarrier::Package);
//! ```

pub mod artifacts;
pub mod codes;
pub mod executor;
pub mod isolation;
pub mod mode;

pub use artifacts::{GroupArtifact, VersionKey};
pub use executor::ExecutorKind;
pub use isolation::{Isolation, LayerName};
pub use mode::{TestBarrier, TestMode};
