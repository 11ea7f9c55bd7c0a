//! Isolation levels and the logical path layers they produce.
//!
//! ## Notes
//! - Isolation levels form a total order of decreasing separation: [`Isolation::Absolute`] keeps every layer
//!   distinct, [`Isolation::None`] folds everything into one layer.

use std::fmt;
use std::str::FromStr;

/// Logical layer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerName {
    Main,
    Test,
    Launcher,
    Isolator,
    /// `main` and `test` folded together.
    Merged,
    /// Every layer folded together.
    All,
}

/// Every layer name, in [`DEFAULT_PRECEDENCE`] order.
pub const ALL_LAYERS: &[LayerName] = DEFAULT_PRECEDENCE;

/// Default pruning precedence: a path kept by an earlier layer is removed from every later layer.
pub const DEFAULT_PRECEDENCE: &[LayerName] = &[
    LayerName::Main,
    LayerName::Merged,
    LayerName::All,
    LayerName::Test,
    LayerName::Launcher,
    LayerName::Isolator,
];

impl LayerName {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerName::Main => "main",
            LayerName::Test => "test",
            LayerName::Launcher => "launcher",
            LayerName::Isolator => "isolator",
            LayerName::Merged => "merged",
            LayerName::All => "all",
        }
    }

    /// Lookup by spelling (case-sensitive).
    pub fn lookup(s: &str) -> Option<LayerName> {
        ALL_LAYERS.iter().copied().find(|layer| layer.as_str() == s)
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the `main`, `test`, `launcher` and `isolator` layers are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Isolation {
    /// Keep all layers distinct.
    #[default]
    Absolute,
    /// Like [`Isolation::Absolute`], but the main output directory moves into `test`.
    ///
    /// Dependencies of `main` stay in `main`.
    Almost,
    /// Fold `main` and `test` into a single `merged` layer; `launcher` and `isolator` stay distinct.
    Merged,
    /// Fold every layer into a single `all` layer.
    None,
}

impl Isolation {
    pub fn as_str(self) -> &'static str {
        match self {
            Isolation::Absolute => "ABSOLUTE",
            Isolation::Almost => "ALMOST",
            Isolation::Merged => "MERGED",
            Isolation::None => "NONE",
        }
    }

    /// Return the layers this level produces, in precedence order.
    ///
    /// ## Notes
    /// - Empty layers are dropped later on, so not every listed layer reaches the command line; `all` is the only
    ///   layer that is always present.
    pub fn layer_names(self) -> &'static [LayerName] {
        match self {
            Isolation::Absolute | Isolation::Almost => {
                &[LayerName::Main, LayerName::Test, LayerName::Launcher, LayerName::Isolator]
            }
            Isolation::Merged => &[LayerName::Merged, LayerName::Launcher, LayerName::Isolator],
            Isolation::None => &[LayerName::All],
        }
    }
}

impl fmt::Display for Isolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported isolation level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownIsolation(pub String);

impl fmt::Display for UnknownIsolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported isolation `{}` (expected one of ABSOLUTE, ALMOST, MERGED, NONE)",
            self.0
        )
    }
}

impl std::error::Error for UnknownIsolation {}

impl FromStr for Isolation {
    type Err = UnknownIsolation;

    /// Parse an isolation level, ignoring ASCII case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ABSOLUTE" => Ok(Isolation::Absolute),
            "ALMOST" => Ok(Isolation::Almost),
            "MERGED" => Ok(Isolation::Merged),
            "NONE" => Ok(Isolation::None),
            _ => Err(UnknownIsolation(s.to_string())),
        }
    }
}
