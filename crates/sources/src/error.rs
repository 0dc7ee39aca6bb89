//! Error types for loading file-backed sources.
//!
//! Responsibilities:
//! - Describe why a source could not load its backing file or directory.
//! - Convert into `BuilderError::Source` so the builder wraps it with its
//!   name and phase.
//!
//! Invariants:
//! - Every variant names the path involved.
//! - Dotenv errors NEVER include raw .env line contents to prevent secret leakage.

use kvconf_engine::BuilderError;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceLoadError {
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON file at {path}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON file at {path} must contain an object at the top level")]
    JsonNotAnObject { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to load key-per-file directory {path}")]
    Directory {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// SAFETY: only the byte index of the failure, NOT the offending line.
    #[error("Failed to parse .env file at {path}, position {error_index}")]
    DotenvParse { path: PathBuf, error_index: usize },

    #[error("Failed to read .env file at {path}: {kind}")]
    DotenvIo { path: PathBuf, kind: ErrorKind },

    #[error("Failed to load .env file at {path}")]
    DotenvUnknown { path: PathBuf },
}

impl From<SourceLoadError> for BuilderError {
    fn from(error: SourceLoadError) -> Self {
        BuilderError::Source(Box::new(error))
    }
}

pub(crate) fn is_not_found(error: &std::io::Error) -> bool {
    error.kind() == ErrorKind::NotFound
}
