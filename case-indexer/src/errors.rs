//! Unified error type for the crate.

use thiserror::Error;

/// Top-level error for corpus operations.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The configured documents directory does not exist.
    #[error("documents directory not found: {0}")]
    DirectoryNotFound(String),

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors (cache manifest).
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
