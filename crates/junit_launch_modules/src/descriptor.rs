//! Module descriptors as read from compiled output.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// A named module: explicit (from `module-info.class`) or automatic (from a jar's manifest or file name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub name: String,
    /// Every package of the module, dot-separated.
    pub packages: BTreeSet<String>,
    pub is_open: bool,
    pub is_automatic: bool,
    /// Required module names, in declaration order.
    pub requires: Vec<String>,
}

impl ModuleDescriptor {
    pub fn automatic(name: impl Into<String>, packages: BTreeSet<String>) -> Self {
        Self {
            name: name.into(),
            packages,
            is_open: false,
            is_automatic: true,
            requires: Vec::new(),
        }
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open {
            f.write_str("open ")?;
        }
        if self.is_automatic {
            f.write_str("automatic ")?;
        }
        write!(f, "module {}", self.name)
    }
}

/// A descriptor together with the location it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub descriptor: ModuleDescriptor,
    pub location: PathBuf,
}
