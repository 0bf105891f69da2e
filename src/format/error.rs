//! Error types for per-frame annotation storage.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing frame annotation files.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON error in {path:?}: {source}")]
    Json {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },

    /// The annotation directory path exists but is not a directory
    #[error("Not a directory: {path:?}")]
    NotADirectory {
        /// The offending path
        path: PathBuf,
    },
}

impl StorageError {
    /// Create an I/O error for a path.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a JSON error for a path.
    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
