//! Error types for Debian packaging steps

use std::path::PathBuf;

use thiserror::Error;

/// Debian-specific error types
#[derive(Error, Debug)]
pub enum DebianError {
    /// Missing required file in debian directory
    #[error("Missing required file: {file} in debian directory for package {package}")]
    MissingRequiredFile { package: String, file: String },

    /// Changelog could not be read or edited
    #[error("Invalid changelog {path:?}: {reason}")]
    InvalidChangelog { path: PathBuf, reason: String },

    /// Unknown value for a mode or kind
    #[error("Unknown {what} '{value}', expected one of: {expected}")]
    UnknownVariant { what: &'static str, value: String, expected: &'static str },

    /// Copying the source tree failed
    #[error("Failed to stage {path:?}: {reason}")]
    StagingFailed { path: PathBuf, reason: String },

    /// Exclude pattern is not a valid glob
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Core library error
    #[error(transparent)]
    Core(#[from] debrel_core::Error),
}

/// Result type alias for Debian operations
pub type Result<T> = std::result::Result<T, DebianError>;

impl DebianError {
    /// Create a missing required file error
    pub fn missing_required_file(package: impl Into<String>, file: impl Into<String>) -> Self {
        Self::MissingRequiredFile { package: package.into(), file: file.into() }
    }

    /// Create an invalid changelog error
    pub fn invalid_changelog(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidChangelog { path: path.into(), reason: reason.into() }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern { pattern: pattern.into(), reason: reason.into() }
    }

    /// Create a staging error
    pub fn staging_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StagingFailed { path: path.into(), reason: reason.into() }
    }
}
