use std::io;
use std::path::PathBuf;

/// Fatal errors raised by the pattern engine.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("root directory not found: {} (expected an existing directory)", path.display())]
    RootNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PatternError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PatternError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A single preset line that could not be used. Recoverable: the line is
/// skipped and the rest of the set is still processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: invalid pattern `{pattern}`: {reason}")]
pub struct InvalidPattern {
    /// 1-based line number in the original input.
    pub line: usize,
    pub pattern: String,
    pub reason: String,
}
