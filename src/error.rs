// src/error.rs

//! Crate-wide error type
//!
//! Only structural problems surface as errors: malformed metadata files,
//! unparsable versions, bad configuration. Per-file filesystem hiccups during
//! a scan or relocation are logged and skipped by the callers instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by scanning, merging and relocating package trees
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{}:{line}: malformed {kind}: {reason}", path.display())]
    MalformedMetadata {
        path: PathBuf,
        line: usize,
        kind: &'static str,
        reason: String,
    },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to parse configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid ignore pattern {pattern:?}: {source}")]
    IgnorePattern {
        pattern: String,
        source: glob::PatternError,
    },
}

impl Error {
    /// Build a structural metadata error for `path` at 1-based `line`
    pub fn malformed(
        path: impl Into<PathBuf>,
        line: usize,
        kind: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedMetadata {
            path: path.into(),
            line,
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for sitefold operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_names_file_and_line() {
        let err = Error::malformed("/tmp/foo.dist-info/RECORD", 3, "RECORD", "expected 3 fields");
        assert_eq!(
            err.to_string(),
            "/tmp/foo.dist-info/RECORD:3: malformed RECORD: expected 3 fields"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
