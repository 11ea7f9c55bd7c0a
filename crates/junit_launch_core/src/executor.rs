//! Execution strategies.

use std::fmt;
use std::str::FromStr;

/// Where the test engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutorKind {
    /// In-process, behind a layered loader chain.
    #[default]
    Direct,
    /// In a forked JVM driven by the console launcher.
    Java,
}

impl ExecutorKind {
    /// Whether the console launcher artifact must be put on the `launcher` layer.
    pub fn injects_console(self) -> bool {
        matches!(self, ExecutorKind::Java)
    }

    /// Whether the isolation worker artifact must be put on the `isolator` layer.
    pub fn injects_worker(self) -> bool {
        matches!(self, ExecutorKind::Direct)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutorKind::Direct => "DIRECT",
            ExecutorKind::Java => "JAVA",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DIRECT" => Ok(ExecutorKind::Direct),
            "JAVA" => Ok(ExecutorKind::Java),
            _ => Err(format!("unsupported executor `{s}` (expected DIRECT or JAVA)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injections_are_exclusive() {
        assert!(ExecutorKind::Java.injects_console());
        assert!(!ExecutorKind::Java.injects_worker());
        assert!(ExecutorKind::Direct.injects_worker());
        assert!(!ExecutorKind::Direct.injects_console());
    }

    #[test]
    fn parse() {
        assert_eq!("java".parse::<ExecutorKind>(), Ok(ExecutorKind::Java));
        assert_eq!("Direct".parse::<ExecutorKind>(), Ok(ExecutorKind::Direct));
        assert!("fork".parse::<ExecutorKind>().is_err());
    }
}
