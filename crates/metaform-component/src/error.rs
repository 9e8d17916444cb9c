//! Error types for component resolution and tree access

use metaform_document::DocumentError;
use std::path::PathBuf;

/// Errors raised while reading components through a tree container
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// File or directory does not exist in the tree
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// IO error during read
    #[error("io error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Component XML could not be parsed
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// Project configuration is unusable
    #[error("invalid project config {}: {message}", path.display())]
    InvalidProject { path: PathBuf, message: String },

    /// Full-name glob could not be compiled
    #[error("invalid name pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl ComponentError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse_error(path: impl Into<PathBuf>, source: DocumentError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
