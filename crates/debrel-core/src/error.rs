//! Error types for the core library

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for deb-release operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Release name is not in the allow-list
    #[error("Invalid release '{name}', please choose among: {}", .allowed.join(", "))]
    UnknownRelease { name: String, allowed: Vec<String> },

    /// No revision could be determined
    #[error("Could not fetch last revision number: {reason}")]
    MissingRevision { reason: String },

    /// No upstream version could be determined
    #[error("Could not determine package version: {reason}")]
    MissingVersion { reason: String },

    /// External command could not be started
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External command exited unsuccessfully
    #[error("{command} failed with {status}{}", stderr_suffix(.stderr))]
    CommandFailed { command: String, status: String, stderr: String },

    /// Filesystem path problem
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// Parse error
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias for deb-release operations
pub type Result<T> = std::result::Result<T, Error>;

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl Error {
    /// Add context to an error
    pub fn context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext { context: context.into(), source: Box::new(source) }
    }

    /// Create a missing revision error
    pub fn missing_revision(reason: impl Into<String>) -> Self {
        Self::MissingRevision { reason: reason.into() }
    }

    /// Create a missing version error
    pub fn missing_version(reason: impl Into<String>) -> Self {
        Self::MissingVersion { reason: reason.into() }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError { message: message.into() }
    }

    /// Whether this error was raised by input validation, before any work began
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownRelease { .. } | Self::MissingRevision { .. } | Self::MissingVersion { .. }
        )
    }
}
