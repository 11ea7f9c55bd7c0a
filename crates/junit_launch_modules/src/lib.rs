//! Classify compiled output as plain class-path roots or named modules.
//!
//! A directory (or jar) is inspected the way the JDK's module finder would look at it:
//!
//! - a `.jar` file is one module, explicit when it carries `module-info.class` (also under
//!   `META-INF/versions/N/`), automatic otherwise;
//! - a directory with `module-info.class` at its root is one exploded module;
//! - any other directory is a directory *of* modules, each entry being a jar or an exploded module.
//!
//! ## Notes
//! - Zero modules is a normal answer (`Ok(None)`): plain class-path output.
//! - More than one module in a single directory is a configuration error ([`ClassifyError::AmbiguousModule`]).
//! - A malformed module artifact (corrupt class file, unparsable automatic name) counts as "no module" and is
//!   reported with a warning.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod automatic;
pub mod classfile;
pub mod descriptor;
pub mod error;
pub mod finder;
pub mod jar;

pub use descriptor::{ModuleDescriptor, ModuleReference};
pub use error::{ClassifyError, MalformedModule};
pub use finder::{classify, find_modules};
