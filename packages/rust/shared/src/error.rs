//! Error types for skumap.
//!
//! Library crates use [`SkuMapError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Note that an unmapped identifier is never an error: resolution outcomes
//! are data (see `skumap_resolver::Resolution`).

use std::path::PathBuf;

/// Top-level error type for all skumap operations.
#[derive(Debug, thiserror::Error)]
pub enum SkuMapError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Tabular input could not be parsed (bad CSV bytes, unreadable workbook).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty mapping key, conflicting canonical entry, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SkuMapError>;

impl SkuMapError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = SkuMapError::config("missing [mappings] table");
        assert_eq!(err.to_string(), "config error: missing [mappings] table");

        let err = SkuMapError::validation("mapping key must not be empty");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn io_error_carries_path() {
        let err = SkuMapError::io(
            "/tmp/upload.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("upload.csv"));
        assert!(msg.contains("gone"));
    }
}
