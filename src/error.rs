//! Build error taxonomy.
//!
//! Errors are split along one axis: fatal errors abort the build (missing
//! storage root, failed publish), while per-artifact errors are recorded as
//! skips and only become fatal when the skip threshold is exceeded.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, parsing, or publishing report artifacts.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The storage root (or another required path) does not exist.
    #[error("storage root not found: {0}")]
    NotFound(PathBuf),

    /// An artifact or record could not be parsed into the report schema.
    #[error("malformed artifact {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// An artifact fetch exceeded its timeout.
    #[error("fetch of {path} timed out after {seconds}s")]
    FetchTimeout { path: PathBuf, seconds: u64 },

    /// A rendered document could not be written to the output root.
    #[error("failed to write {path}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Fatal errors terminate the build early; the rest are recorded as
    /// skips against the threshold.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BuildError::NotFound(_) | BuildError::WriteError { .. })
    }
}
