use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by module classification.
#[derive(Debug, Error, Diagnostic)]
pub enum ClassifyError {
    #[error("{} contains {} modules ({}), expected at most one", directory.display(), modules.len(), modules.join(", "))]
    #[diagnostic(
        code(junit_launch::classify::ambiguous),
        help("an output directory holds exactly one module declaration or none at all")
    )]
    AmbiguousModule { directory: PathBuf, modules: Vec<String> },

    #[error("failed to read {}", path.display())]
    #[diagnostic(code(junit_launch::classify::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClassifyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ClassifyError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a module artifact could not be read.
///
/// Never escapes [`crate::classify`]: a malformed artifact counts as "no module".
#[derive(Debug, Error)]
pub enum MalformedModule {
    #[error("truncated class file at offset {offset}")]
    Truncated { offset: usize },

    #[error("bad class file magic {0:#010x}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool entry {index} is not a {expected}")]
    BadConstant { index: u16, expected: &'static str },

    #[error("class file declares no Module attribute")]
    MissingModuleAttribute,

    #[error("invalid module name `{0}`")]
    InvalidName(String),

    #[error("unreadable jar: {0}")]
    Jar(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
