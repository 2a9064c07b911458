//! Error types for the release pipeline

use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum BuildError {
    /// One or more releases of a multi-release run failed
    #[error("{} of {total} releases failed: {}", .failed.len(), .failed.join(", "))]
    ReleasesFailed { failed: Vec<String>, total: usize },

    /// Core library error
    #[error(transparent)]
    Core(#[from] debrel_core::Error),

    /// Debian step error
    #[error(transparent)]
    Debian(#[from] debrel_debian::DebianError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Whether the run was refused before touching the filesystem
    pub fn is_validation(&self) -> bool {
        match self {
            Self::Core(e) => e.is_validation(),
            Self::Debian(debrel_debian::DebianError::Core(e)) => e.is_validation(),
            _ => false,
        }
    }
}
